//! NFS entry types and data structures
//!
//! These types represent directory entries returned from READDIRPLUS and the
//! stream the tree deletion walker folds over.

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryType {
    /// Regular file
    File = 0,
    /// Directory
    Directory = 1,
    /// Symbolic link
    Symlink = 2,
    /// Block device
    BlockDevice = 3,
    /// Character device
    CharDevice = 4,
    /// Named pipe (FIFO)
    Fifo = 5,
    /// Unix socket
    Socket = 6,
    /// Unknown type
    Unknown = 255,
}

impl EntryType {
    /// Convert from mode bits (standard Unix type values)
    pub fn from_mode(mode: u32) -> Self {
        match mode & 0o170000 {
            0o100000 => EntryType::File,        // S_IFREG
            0o040000 => EntryType::Directory,   // S_IFDIR
            0o120000 => EntryType::Symlink,     // S_IFLNK
            0o060000 => EntryType::BlockDevice, // S_IFBLK
            0o020000 => EntryType::CharDevice,  // S_IFCHR
            0o010000 => EntryType::Fifo,        // S_IFIFO
            0o140000 => EntryType::Socket,      // S_IFSOCK
            _ => EntryType::Unknown,
        }
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryType::Directory
    }
}

/// A directory entry returned from READDIRPLUS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsDirEntry {
    /// Entry name (not full path)
    pub name: String,

    /// Entry type, from the entry's post-op attributes
    pub entry_type: EntryType,

    /// File size in bytes (0 when attributes are absent)
    pub size: u64,
}

impl NfsDirEntry {
    /// Create an entry
    pub fn new(name: impl Into<String>, entry_type: EntryType, size: u64) -> Self {
        Self {
            name: name.into(),
            entry_type,
            size,
        }
    }

    /// Check if this is the "." or ".." entry
    pub fn is_special(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Entries of one directory, delivered in server order
///
/// The stream is finite and consumed by value: once it has been iterated it
/// cannot be restarted, mirroring a READDIRPLUS cookie walk.
#[derive(Debug)]
pub struct DirStream {
    entries: std::vec::IntoIter<NfsDirEntry>,
}

impl DirStream {
    /// Wrap a fully read listing
    pub fn new(entries: Vec<NfsDirEntry>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for DirStream {
    type Item = NfsDirEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// Join a directory path and an entry name
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}
