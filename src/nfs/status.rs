//! Protocol status codes
//!
//! Filesystem primitives return NFSv3 `nfsstat3` values, lock primitives
//! return NLMv4 `nlm4_stats` values. Both are plain `u32`s on the wire and
//! are validated against loadfile patterns the same way.

/// Raw status code as returned by a backend primitive
pub type StatusCode = u32;

/// NFSv3 status codes (RFC 1813, section 2.6)
pub mod nfs3 {
    use super::StatusCode;

    pub const OK: StatusCode = 0;
    pub const ERR_PERM: StatusCode = 1;
    pub const ERR_NOENT: StatusCode = 2;
    pub const ERR_IO: StatusCode = 5;
    pub const ERR_NXIO: StatusCode = 6;
    pub const ERR_ACCES: StatusCode = 13;
    pub const ERR_EXIST: StatusCode = 17;
    pub const ERR_XDEV: StatusCode = 18;
    pub const ERR_NODEV: StatusCode = 19;
    pub const ERR_NOTDIR: StatusCode = 20;
    pub const ERR_ISDIR: StatusCode = 21;
    pub const ERR_INVAL: StatusCode = 22;
    pub const ERR_FBIG: StatusCode = 27;
    pub const ERR_NOSPC: StatusCode = 28;
    pub const ERR_ROFS: StatusCode = 30;
    pub const ERR_MLINK: StatusCode = 31;
    pub const ERR_NAMETOOLONG: StatusCode = 63;
    pub const ERR_NOTEMPTY: StatusCode = 66;
    pub const ERR_DQUOT: StatusCode = 69;
    pub const ERR_STALE: StatusCode = 70;
    pub const ERR_REMOTE: StatusCode = 71;
    pub const ERR_BADHANDLE: StatusCode = 10001;
    pub const ERR_NOT_SYNC: StatusCode = 10002;
    pub const ERR_BAD_COOKIE: StatusCode = 10003;
    pub const ERR_NOTSUPP: StatusCode = 10004;
    pub const ERR_TOOSMALL: StatusCode = 10005;
    pub const ERR_SERVERFAULT: StatusCode = 10006;
    pub const ERR_BADTYPE: StatusCode = 10007;
    pub const ERR_JUKEBOX: StatusCode = 10008;

    /// Symbolic name of an NFSv3 status, for diagnostics
    pub fn describe(status: StatusCode) -> &'static str {
        match status {
            OK => "NFS3_OK",
            ERR_PERM => "NFS3ERR_PERM",
            ERR_NOENT => "NFS3ERR_NOENT",
            ERR_IO => "NFS3ERR_IO",
            ERR_NXIO => "NFS3ERR_NXIO",
            ERR_ACCES => "NFS3ERR_ACCES",
            ERR_EXIST => "NFS3ERR_EXIST",
            ERR_XDEV => "NFS3ERR_XDEV",
            ERR_NODEV => "NFS3ERR_NODEV",
            ERR_NOTDIR => "NFS3ERR_NOTDIR",
            ERR_ISDIR => "NFS3ERR_ISDIR",
            ERR_INVAL => "NFS3ERR_INVAL",
            ERR_FBIG => "NFS3ERR_FBIG",
            ERR_NOSPC => "NFS3ERR_NOSPC",
            ERR_ROFS => "NFS3ERR_ROFS",
            ERR_MLINK => "NFS3ERR_MLINK",
            ERR_NAMETOOLONG => "NFS3ERR_NAMETOOLONG",
            ERR_NOTEMPTY => "NFS3ERR_NOTEMPTY",
            ERR_DQUOT => "NFS3ERR_DQUOT",
            ERR_STALE => "NFS3ERR_STALE",
            ERR_REMOTE => "NFS3ERR_REMOTE",
            ERR_BADHANDLE => "NFS3ERR_BADHANDLE",
            ERR_NOT_SYNC => "NFS3ERR_NOT_SYNC",
            ERR_BAD_COOKIE => "NFS3ERR_BAD_COOKIE",
            ERR_NOTSUPP => "NFS3ERR_NOTSUPP",
            ERR_TOOSMALL => "NFS3ERR_TOOSMALL",
            ERR_SERVERFAULT => "NFS3ERR_SERVERFAULT",
            ERR_BADTYPE => "NFS3ERR_BADTYPE",
            ERR_JUKEBOX => "NFS3ERR_JUKEBOX",
            _ => "NFS3ERR_UNKNOWN",
        }
    }
}

/// NLMv4 status codes (lock manager, used by LOCK/UNLOCK/TEST)
pub mod nlm4 {
    use super::StatusCode;

    pub const GRANTED: StatusCode = 0;
    pub const DENIED: StatusCode = 1;
    pub const DENIED_NOLOCKS: StatusCode = 2;
    pub const BLOCKED: StatusCode = 3;
    pub const DENIED_GRACE_PERIOD: StatusCode = 4;
    pub const DEADLCK: StatusCode = 5;
    pub const ROFS: StatusCode = 6;
    pub const STALE_FH: StatusCode = 7;
    pub const FBIG: StatusCode = 8;
    pub const FAILED: StatusCode = 9;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(nfs3::describe(nfs3::OK), "NFS3_OK");
        assert_eq!(nfs3::describe(nfs3::ERR_NOTEMPTY), "NFS3ERR_NOTEMPTY");
        assert_eq!(nfs3::describe(12345), "NFS3ERR_UNKNOWN");
    }
}
