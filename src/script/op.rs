//! Operation vocabulary

use std::fmt;

/// Kind of a scripted operation
///
/// The set is closed: every kind has exactly one handler in the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Getattr,
    Setattr,
    Pathconf,
    Readlink,
    Lookup,
    Create,
    Write,
    Commit,
    Read,
    Access,
    Mkdir,
    Rmdir,
    Fsstat,
    Fsinfo,
    Symlink,
    Remove,
    Readdirplus,
    Link,
    Lock,
    Unlock,
    Test,
    Rename,
    /// Recursive removal of a subtree
    Deltree,
}

impl OpKind {
    /// Number of operation kinds
    pub const COUNT: usize = 23;

    /// All kinds in table order
    pub const ALL: [OpKind; OpKind::COUNT] = [
        OpKind::Getattr,
        OpKind::Setattr,
        OpKind::Pathconf,
        OpKind::Readlink,
        OpKind::Lookup,
        OpKind::Create,
        OpKind::Write,
        OpKind::Commit,
        OpKind::Read,
        OpKind::Access,
        OpKind::Mkdir,
        OpKind::Rmdir,
        OpKind::Fsstat,
        OpKind::Fsinfo,
        OpKind::Symlink,
        OpKind::Remove,
        OpKind::Readdirplus,
        OpKind::Link,
        OpKind::Lock,
        OpKind::Unlock,
        OpKind::Test,
        OpKind::Rename,
        OpKind::Deltree,
    ];

    /// Position in [`OpKind::ALL`], used to index statistics tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Upper-case name as printed in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Getattr => "GETATTR",
            OpKind::Setattr => "SETATTR",
            OpKind::Pathconf => "PATHCONF",
            OpKind::Readlink => "READLINK",
            OpKind::Lookup => "LOOKUP",
            OpKind::Create => "CREATE",
            OpKind::Write => "WRITE",
            OpKind::Commit => "COMMIT",
            OpKind::Read => "READ",
            OpKind::Access => "ACCESS",
            OpKind::Mkdir => "MKDIR",
            OpKind::Rmdir => "RMDIR",
            OpKind::Fsstat => "FSSTAT",
            OpKind::Fsinfo => "FSINFO",
            OpKind::Symlink => "SYMLINK",
            OpKind::Remove => "REMOVE",
            OpKind::Readdirplus => "READDIRPLUS",
            OpKind::Link => "LINK",
            OpKind::Lock => "LOCK",
            OpKind::Unlock => "UNLOCK",
            OpKind::Test => "TEST",
            OpKind::Rename => "RENAME",
            OpKind::Deltree => "DELTREE",
        }
    }

    /// Look up a loadfile operation name
    ///
    /// Matching is case-insensitive and accepts the NFSv3 spelling with a
    /// trailing `3` (`GETATTR3`).
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        let base = upper.strip_suffix('3').unwrap_or(&upper);
        OpKind::ALL.into_iter().find(|kind| kind.name() == base)
    }

    /// Number of paths the operation takes
    pub fn path_count(self) -> usize {
        match self {
            OpKind::Fsstat | OpKind::Fsinfo => 0,
            OpKind::Symlink | OpKind::Link | OpKind::Rename => 2,
            _ => 1,
        }
    }

    /// Minimum number of numeric parameters
    pub fn min_params(self) -> usize {
        match self {
            OpKind::Write | OpKind::Read | OpKind::Lock | OpKind::Unlock | OpKind::Test => 2,
            _ => 0,
        }
    }

    /// Whether the operation moves file data (counted in throughput)
    pub fn is_io(self) -> bool {
        matches!(self, OpKind::Write | OpKind::Read)
    }

    /// Whether the status comes from the lock manager
    pub fn is_lock(self) -> bool {
        matches!(self, OpKind::Lock | OpKind::Unlock | OpKind::Test)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_index() {
        for (i, kind) in OpKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(OpKind::from_name("GETATTR3"), Some(OpKind::Getattr));
        assert_eq!(OpKind::from_name("getattr"), Some(OpKind::Getattr));
        assert_eq!(OpKind::from_name("Readdirplus3"), Some(OpKind::Readdirplus));
        assert_eq!(OpKind::from_name("Deltree"), Some(OpKind::Deltree));
        assert_eq!(OpKind::from_name("TEST"), Some(OpKind::Test));
        assert_eq!(OpKind::from_name("NULL3"), None);
        assert_eq!(OpKind::from_name(""), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(OpKind::Fsstat.path_count(), 0);
        assert_eq!(OpKind::Rename.path_count(), 2);
        assert_eq!(OpKind::Write.min_params(), 2);
        assert_eq!(OpKind::Commit.min_params(), 0);
        assert!(OpKind::Test.is_lock());
        assert!(OpKind::Read.is_io());
        assert_eq!(OpKind::Readlink.to_string(), "READLINK");
    }
}
