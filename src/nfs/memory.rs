//! In-memory simulated NFSv3 server
//!
//! All connections opened by one `MemoryConnector` share a single tree, so
//! clients observe each other's `/clients` directory exactly as they would on
//! a real export. Status codes follow NFSv3 semantics closely enough for
//! loadfiles written against a real server to validate.
//!
//! Hard links are simulated by copying the file node; sizes of linked names
//! diverge after the link is made.

use crate::error::BackendResult;
use crate::nfs::status::{nfs3, nlm4, StatusCode};
use crate::nfs::types::{DirStream, EntryType, NfsDirEntry};
use crate::nfs::{Backend, ConnectOptions, Connector, StableHow};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Shared handle on a simulated tree
pub type SharedFs = Arc<Mutex<MemoryFs>>;

#[derive(Debug, Clone)]
enum Node {
    File { size: u64 },
    Dir { children: BTreeMap<String, Node> },
    Symlink,
}

impl Node {
    fn empty_dir() -> Self {
        Node::Dir {
            children: BTreeMap::new(),
        }
    }

    fn entry_type(&self) -> EntryType {
        match self {
            Node::File { .. } => EntryType::File,
            Node::Dir { .. } => EntryType::Directory,
            Node::Symlink => EntryType::Symlink,
        }
    }

    fn size(&self) -> u64 {
        match self {
            Node::File { size } => *size,
            _ => 0,
        }
    }
}

/// One primitive call seen by the simulated server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Client that issued the call
    pub client: usize,

    /// Primitive name, upper case (e.g. "RMDIR")
    pub op: &'static str,

    /// Primary path ("" for FSSTAT/FSINFO)
    pub path: String,
}

#[derive(Debug, Clone, Copy)]
struct LockRange {
    owner: usize,
    offset: u64,
    len: u64,
}

impl LockRange {
    /// End of the range; a zero length locks to end of file
    fn end(&self) -> u64 {
        if self.len == 0 {
            u64::MAX
        } else {
            self.offset.saturating_add(self.len)
        }
    }

    fn overlaps(&self, other: &LockRange) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Simulated export: a directory tree plus NLM lock table
#[derive(Debug)]
pub struct MemoryFs {
    root: Node,
    locks: HashMap<String, Vec<LockRange>>,
    history: Option<Vec<Call>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

impl MemoryFs {
    /// Create an empty export
    pub fn new() -> Self {
        Self {
            root: Node::empty_dir(),
            locks: HashMap::new(),
            history: None,
        }
    }

    /// Create an empty export that records every call
    pub fn with_history() -> Self {
        Self {
            history: Some(Vec::new()),
            ..Self::new()
        }
    }

    /// Wrap into a shareable handle
    pub fn shared(self) -> SharedFs {
        Arc::new(Mutex::new(self))
    }

    /// Calls recorded so far (empty unless built with `with_history`)
    pub fn history(&self) -> &[Call] {
        self.history.as_deref().unwrap_or(&[])
    }

    /// Forget recorded calls
    pub fn clear_history(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }
    }

    /// Check whether a path exists
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Size of a regular file
    pub fn file_size(&self, path: &str) -> Option<u64> {
        match self.resolve(path) {
            Ok(Node::File { size }) => Some(*size),
            _ => None,
        }
    }

    fn record(&mut self, client: usize, op: &'static str, path: &str) {
        if let Some(history) = self.history.as_mut() {
            history.push(Call {
                client,
                op,
                path: path.to_string(),
            });
        }
    }

    fn resolve(&self, path: &str) -> Result<&Node, StatusCode> {
        let mut node = &self.root;
        for comp in components(path) {
            node = match node {
                Node::Dir { children } => children.get(comp).ok_or(nfs3::ERR_NOENT)?,
                _ => return Err(nfs3::ERR_NOTDIR),
            };
        }
        Ok(node)
    }

    fn resolve_mut(&mut self, path: &str) -> Result<&mut Node, StatusCode> {
        let mut node = &mut self.root;
        for comp in components(path) {
            node = match node {
                Node::Dir { children } => children.get_mut(comp).ok_or(nfs3::ERR_NOENT)?,
                _ => return Err(nfs3::ERR_NOTDIR),
            };
        }
        Ok(node)
    }

    /// Parent directory's children and the final component of `path`
    fn parent_mut<'a>(
        &mut self,
        path: &'a str,
    ) -> Result<(&mut BTreeMap<String, Node>, &'a str), StatusCode> {
        let comps = components(path);
        let (name, parents) = comps.split_last().ok_or(nfs3::ERR_INVAL)?;
        let mut node = &mut self.root;
        for comp in parents {
            node = match node {
                Node::Dir { children } => children.get_mut(*comp).ok_or(nfs3::ERR_NOENT)?,
                _ => return Err(nfs3::ERR_NOTDIR),
            };
        }
        match node {
            Node::Dir { children } => Ok((children, *name)),
            _ => Err(nfs3::ERR_NOTDIR),
        }
    }

    fn status_of<T>(result: Result<T, StatusCode>) -> StatusCode {
        match result {
            Ok(_) => nfs3::OK,
            Err(status) => status,
        }
    }

    fn lookup(&self, path: &str) -> StatusCode {
        Self::status_of(self.resolve(path))
    }

    fn readlink(&self, path: &str) -> StatusCode {
        match self.resolve(path) {
            Ok(Node::Symlink) => nfs3::OK,
            Ok(_) => nfs3::ERR_INVAL,
            Err(status) => status,
        }
    }

    fn create(&mut self, path: &str) -> StatusCode {
        let (children, name) = match self.parent_mut(path) {
            Ok(found) => found,
            Err(status) => return status,
        };
        match children.get_mut(name) {
            Some(Node::File { size }) => {
                *size = 0;
                nfs3::OK
            }
            Some(_) => nfs3::ERR_EXIST,
            None => {
                children.insert(name.to_string(), Node::File { size: 0 });
                nfs3::OK
            }
        }
    }

    fn write(&mut self, path: &str, offset: u64, len: u64) -> StatusCode {
        match self.resolve_mut(path) {
            Ok(Node::File { size }) => {
                *size = (*size).max(offset.saturating_add(len));
                nfs3::OK
            }
            Ok(Node::Dir { .. }) => nfs3::ERR_ISDIR,
            Ok(Node::Symlink) => nfs3::ERR_INVAL,
            Err(status) => status,
        }
    }

    fn read(&self, path: &str) -> StatusCode {
        match self.resolve(path) {
            Ok(Node::File { .. }) => nfs3::OK,
            Ok(Node::Dir { .. }) => nfs3::ERR_ISDIR,
            Ok(Node::Symlink) => nfs3::ERR_INVAL,
            Err(status) => status,
        }
    }

    fn mkdir(&mut self, path: &str) -> StatusCode {
        let (children, name) = match self.parent_mut(path) {
            Ok(found) => found,
            Err(status) => return status,
        };
        if children.contains_key(name) {
            return nfs3::ERR_EXIST;
        }
        children.insert(name.to_string(), Node::empty_dir());
        nfs3::OK
    }

    fn rmdir(&mut self, path: &str) -> StatusCode {
        let (children, name) = match self.parent_mut(path) {
            Ok(found) => found,
            Err(status) => return status,
        };
        let status = match children.get(name) {
            None => nfs3::ERR_NOENT,
            Some(Node::Dir { children: inner }) if !inner.is_empty() => nfs3::ERR_NOTEMPTY,
            Some(Node::Dir { .. }) => nfs3::OK,
            Some(_) => nfs3::ERR_NOTDIR,
        };
        if status == nfs3::OK {
            children.remove(name);
        }
        status
    }

    fn symlink(&mut self, link: &str) -> StatusCode {
        let (children, name) = match self.parent_mut(link) {
            Ok(found) => found,
            Err(status) => return status,
        };
        if children.contains_key(name) {
            return nfs3::ERR_EXIST;
        }
        children.insert(name.to_string(), Node::Symlink);
        nfs3::OK
    }

    fn remove(&mut self, path: &str) -> StatusCode {
        let (children, name) = match self.parent_mut(path) {
            Ok(found) => found,
            Err(status) => return status,
        };
        let status = match children.get(name) {
            None => nfs3::ERR_NOENT,
            Some(Node::Dir { .. }) => nfs3::ERR_ISDIR,
            Some(_) => nfs3::OK,
        };
        if status == nfs3::OK {
            children.remove(name);
            self.locks.remove(path);
        }
        status
    }

    fn readdirplus(&self, path: &str) -> Result<DirStream, StatusCode> {
        match self.resolve(path)? {
            Node::Dir { children } => {
                let mut entries = Vec::with_capacity(children.len() + 2);
                entries.push(NfsDirEntry::new(".", EntryType::Directory, 0));
                entries.push(NfsDirEntry::new("..", EntryType::Directory, 0));
                entries.extend(children.iter().map(|(name, node)| {
                    NfsDirEntry::new(name.clone(), node.entry_type(), node.size())
                }));
                Ok(DirStream::new(entries))
            }
            _ => Err(nfs3::ERR_NOTDIR),
        }
    }

    fn link(&mut self, link: &str, existing: &str) -> StatusCode {
        let node = match self.resolve(existing) {
            Ok(Node::Dir { .. }) => return nfs3::ERR_ISDIR,
            Ok(node) => node.clone(),
            Err(status) => return status,
        };
        let (children, name) = match self.parent_mut(link) {
            Ok(found) => found,
            Err(status) => return status,
        };
        if children.contains_key(name) {
            return nfs3::ERR_EXIST;
        }
        children.insert(name.to_string(), node);
        nfs3::OK
    }

    fn rename(&mut self, from: &str, to: &str) -> StatusCode {
        let from_norm = format!("/{}", components(from).join("/"));
        let to_norm = format!("/{}", components(to).join("/"));
        if from_norm == to_norm {
            return self.lookup(from);
        }
        if to_norm.starts_with(&format!("{}/", from_norm)) {
            return nfs3::ERR_INVAL;
        }

        let source_is_dir = match self.resolve(from) {
            Ok(node) => matches!(node, Node::Dir { .. }),
            Err(status) => return status,
        };
        match self.resolve(to) {
            Ok(Node::Dir { .. }) if !source_is_dir => return nfs3::ERR_ISDIR,
            Ok(Node::Dir { children }) if !children.is_empty() => return nfs3::ERR_NOTEMPTY,
            Ok(Node::Dir { .. }) => {}
            Ok(_) if source_is_dir => return nfs3::ERR_NOTDIR,
            Ok(_) => {}
            Err(nfs3::ERR_NOENT) => {}
            Err(status) => return status,
        }
        // Destination parent must exist before the source is detached
        if let Err(status) = self.parent_mut(to) {
            return status;
        }

        let node = match self.parent_mut(from) {
            Ok((children, name)) => match children.remove(name) {
                Some(node) => node,
                None => return nfs3::ERR_NOENT,
            },
            Err(status) => return status,
        };
        match self.parent_mut(to) {
            Ok((children, name)) => {
                children.insert(name.to_string(), node);
            }
            Err(status) => return status,
        }
        if let Some(ranges) = self.locks.remove(from) {
            self.locks.insert(to.to_string(), ranges);
        }
        nfs3::OK
    }

    fn conflicts(&self, path: &str, wanted: &LockRange) -> bool {
        self.locks
            .get(path)
            .map(|ranges| {
                ranges
                    .iter()
                    .any(|held| held.owner != wanted.owner && held.overlaps(wanted))
            })
            .unwrap_or(false)
    }

    fn lock(&mut self, path: &str, range: LockRange) -> StatusCode {
        if !matches!(self.resolve(path), Ok(Node::File { .. })) {
            return nlm4::FAILED;
        }
        if self.conflicts(path, &range) {
            return nlm4::DENIED;
        }
        self.locks.entry(path.to_string()).or_default().push(range);
        nlm4::GRANTED
    }

    fn unlock(&mut self, path: &str, range: LockRange) -> StatusCode {
        if let Some(ranges) = self.locks.get_mut(path) {
            ranges.retain(|held| {
                !(held.owner == range.owner && held.offset == range.offset && held.len == range.len)
            });
            if ranges.is_empty() {
                self.locks.remove(path);
            }
        }
        nlm4::GRANTED
    }

    fn test_lock(&self, path: &str, range: LockRange) -> StatusCode {
        if !matches!(self.resolve(path), Ok(Node::File { .. })) {
            return nlm4::FAILED;
        }
        if self.conflicts(path, &range) {
            nlm4::DENIED
        } else {
            nlm4::GRANTED
        }
    }
}

/// Connector handing out connections to one shared simulated tree
pub struct MemoryConnector {
    fs: SharedFs,
    options: ConnectOptions,
}

impl MemoryConnector {
    /// Create a connector over a fresh, empty tree
    pub fn new(options: ConnectOptions) -> Self {
        Self::with_fs(MemoryFs::new().shared(), options)
    }

    /// Create a connector over an existing tree
    pub fn with_fs(fs: SharedFs, options: ConnectOptions) -> Self {
        Self { fs, options }
    }

    /// Handle on the simulated tree
    pub fn fs(&self) -> SharedFs {
        Arc::clone(&self.fs)
    }
}

impl Connector for MemoryConnector {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn connect(
        &self,
        target: &str,
        client_id: usize,
        num_clients: usize,
    ) -> BackendResult<Box<dyn Backend>> {
        debug!(
            client = client_id,
            clients = num_clients,
            url = target,
            "Connected to in-memory export"
        );
        Ok(Box::new(MemoryBackend::new(
            Arc::clone(&self.fs),
            client_id,
            self.options.nlm,
        )))
    }
}

/// One client's connection to a simulated tree
pub struct MemoryBackend {
    fs: SharedFs,
    client: usize,
    nlm: bool,
}

impl MemoryBackend {
    /// Create a connection for `client`
    pub fn new(fs: SharedFs, client: usize, nlm: bool) -> Self {
        Self { fs, client, nlm }
    }

    fn range(&self, offset: u64, len: u64) -> LockRange {
        LockRange {
            owner: self.client,
            offset,
            len,
        }
    }
}

impl Backend for MemoryBackend {
    fn lookup(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "LOOKUP", path);
        fs.lookup(path)
    }

    fn getattr(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "GETATTR", path);
        fs.lookup(path)
    }

    fn setattr(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "SETATTR", path);
        fs.lookup(path)
    }

    fn pathconf(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "PATHCONF", path);
        fs.lookup(path)
    }

    fn readlink(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "READLINK", path);
        fs.readlink(path)
    }

    fn create(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "CREATE", path);
        fs.create(path)
    }

    fn write(&mut self, path: &str, offset: u64, data: &[u8], _stable: StableHow) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "WRITE", path);
        fs.write(path, offset, data.len() as u64)
    }

    fn commit(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "COMMIT", path);
        fs.lookup(path)
    }

    fn read(&mut self, path: &str, _offset: u64, buf: &mut [u8]) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "READ", path);
        let status = fs.read(path);
        if status == nfs3::OK {
            buf.fill(0);
        }
        status
    }

    fn access(&mut self, path: &str, _mask: u32) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "ACCESS", path);
        fs.lookup(path)
    }

    fn mkdir(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "MKDIR", path);
        fs.mkdir(path)
    }

    fn rmdir(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "RMDIR", path);
        fs.rmdir(path)
    }

    fn fsstat(&mut self) -> StatusCode {
        self.fs.lock().record(self.client, "FSSTAT", "");
        nfs3::OK
    }

    fn fsinfo(&mut self) -> StatusCode {
        self.fs.lock().record(self.client, "FSINFO", "");
        nfs3::OK
    }

    fn symlink(&mut self, link: &str, _target: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "SYMLINK", link);
        fs.symlink(link)
    }

    fn remove(&mut self, path: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "REMOVE", path);
        fs.remove(path)
    }

    fn readdirplus(&mut self, path: &str) -> Result<DirStream, StatusCode> {
        let mut fs = self.fs.lock();
        fs.record(self.client, "READDIRPLUS", path);
        fs.readdirplus(path)
    }

    fn link(&mut self, link: &str, existing: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "LINK", link);
        fs.link(link, existing)
    }

    fn lock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode {
        let range = self.range(offset, len);
        let mut fs = self.fs.lock();
        fs.record(self.client, "LOCK", path);
        if !self.nlm {
            return nlm4::DENIED_NOLOCKS;
        }
        fs.lock(path, range)
    }

    fn unlock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode {
        let range = self.range(offset, len);
        let mut fs = self.fs.lock();
        fs.record(self.client, "UNLOCK", path);
        if !self.nlm {
            return nlm4::DENIED_NOLOCKS;
        }
        fs.unlock(path, range)
    }

    fn test_lock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode {
        let range = self.range(offset, len);
        let mut fs = self.fs.lock();
        fs.record(self.client, "TEST", path);
        if !self.nlm {
            return nlm4::DENIED_NOLOCKS;
        }
        fs.test_lock(path, range)
    }

    fn rename(&mut self, from: &str, to: &str) -> StatusCode {
        let mut fs = self.fs.lock();
        fs.record(self.client, "RENAME", from);
        fs.rename(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(fs: &SharedFs, client: usize) -> MemoryBackend {
        MemoryBackend::new(Arc::clone(fs), client, true)
    }

    #[test]
    fn test_lookup_and_create() {
        let fs = MemoryFs::new().shared();
        let mut b = backend(&fs, 0);

        assert_eq!(b.lookup("/clients"), nfs3::ERR_NOENT);
        assert_eq!(b.create("/clients/f"), nfs3::ERR_NOENT);
        assert_eq!(b.mkdir("/clients"), nfs3::OK);
        assert_eq!(b.mkdir("/clients"), nfs3::ERR_EXIST);
        assert_eq!(b.create("/clients/f"), nfs3::OK);
        assert_eq!(b.getattr("/clients/f"), nfs3::OK);
        assert_eq!(b.lookup("/clients/f/x"), nfs3::ERR_NOTDIR);
        assert_eq!(b.create("/clients"), nfs3::ERR_EXIST);
    }

    #[test]
    fn test_write_extends_file() {
        let fs = MemoryFs::new().shared();
        let mut b = backend(&fs, 0);
        b.create("/f");

        assert_eq!(b.write("/f", 4096, &[0u8; 100], StableHow::FileSync), nfs3::OK);
        assert_eq!(fs.lock().file_size("/f"), Some(4196));
        assert_eq!(b.write("/f", 0, &[0u8; 10], StableHow::Unstable), nfs3::OK);
        assert_eq!(fs.lock().file_size("/f"), Some(4196));

        let mut buf = [1u8; 8];
        assert_eq!(b.read("/f", 0, &mut buf), nfs3::OK);
        assert_eq!(buf, [0u8; 8]);
        assert_eq!(b.read("/", 0, &mut buf), nfs3::ERR_ISDIR);
        assert_eq!(b.write("/missing", 0, &buf, StableHow::Unstable), nfs3::ERR_NOENT);
    }

    #[test]
    fn test_rmdir_and_remove() {
        let fs = MemoryFs::new().shared();
        let mut b = backend(&fs, 0);
        b.mkdir("/d");
        b.create("/d/f");

        assert_eq!(b.rmdir("/d"), nfs3::ERR_NOTEMPTY);
        assert_eq!(b.remove("/d"), nfs3::ERR_ISDIR);
        assert_eq!(b.rmdir("/d/f"), nfs3::ERR_NOTDIR);
        assert_eq!(b.remove("/d/f"), nfs3::OK);
        assert_eq!(b.remove("/d/f"), nfs3::ERR_NOENT);
        assert_eq!(b.rmdir("/d"), nfs3::OK);
        assert_eq!(b.rmdir("/d"), nfs3::ERR_NOENT);
    }

    #[test]
    fn test_readdirplus_lists_special_entries_first() {
        let fs = MemoryFs::new().shared();
        let mut b = backend(&fs, 0);
        b.mkdir("/d");
        b.mkdir("/d/sub");
        b.create("/d/file");

        let entries: Vec<_> = b.readdirplus("/d").unwrap().collect();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".", "..", "file", "sub"]);
        assert_eq!(entries[2].entry_type, EntryType::File);
        assert!(entries[3].entry_type.is_dir());

        assert_eq!(b.readdirplus("/d/file").unwrap_err(), nfs3::ERR_NOTDIR);
        assert_eq!(b.readdirplus("/nope").unwrap_err(), nfs3::ERR_NOENT);
    }

    #[test]
    fn test_symlink_link_and_readlink() {
        let fs = MemoryFs::new().shared();
        let mut b = backend(&fs, 0);
        b.create("/target");

        assert_eq!(b.symlink("/sym", "/target"), nfs3::OK);
        assert_eq!(b.symlink("/sym", "/target"), nfs3::ERR_EXIST);
        assert_eq!(b.readlink("/sym"), nfs3::OK);
        assert_eq!(b.readlink("/target"), nfs3::ERR_INVAL);

        assert_eq!(b.link("/hard", "/target"), nfs3::OK);
        assert_eq!(b.link("/hard", "/target"), nfs3::ERR_EXIST);
        assert_eq!(b.link("/other", "/missing"), nfs3::ERR_NOENT);
        assert_eq!(b.link("/dirlink", "/"), nfs3::ERR_ISDIR);
    }

    #[test]
    fn test_rename() {
        let fs = MemoryFs::new().shared();
        let mut b = backend(&fs, 0);
        b.mkdir("/a");
        b.create("/a/f");
        b.mkdir("/b");

        assert_eq!(b.rename("/a/f", "/b/g"), nfs3::OK);
        assert_eq!(b.lookup("/a/f"), nfs3::ERR_NOENT);
        assert_eq!(b.lookup("/b/g"), nfs3::OK);

        assert_eq!(b.rename("/missing", "/b/x"), nfs3::ERR_NOENT);
        assert_eq!(b.rename("/b/g", "/nodir/x"), nfs3::ERR_NOENT);
        assert_eq!(b.lookup("/b/g"), nfs3::OK);
        assert_eq!(b.rename("/a", "/a/inner"), nfs3::ERR_INVAL);
        assert_eq!(b.rename("/b/g", "/a"), nfs3::ERR_ISDIR);
        assert_eq!(b.rename("/a", "/b"), nfs3::ERR_NOTEMPTY);
    }

    #[test]
    fn test_lock_conflicts_between_clients() {
        let fs = MemoryFs::new().shared();
        let mut one = backend(&fs, 1);
        let mut two = backend(&fs, 2);
        one.create("/f");

        assert_eq!(one.lock("/f", 0, 100), nlm4::GRANTED);
        assert_eq!(two.test_lock("/f", 50, 10), nlm4::DENIED);
        assert_eq!(two.lock("/f", 50, 10), nlm4::DENIED);
        assert_eq!(two.lock("/f", 100, 10), nlm4::GRANTED);
        assert_eq!(one.test_lock("/f", 0, 10), nlm4::GRANTED);

        assert_eq!(one.unlock("/f", 0, 100), nlm4::GRANTED);
        assert_eq!(two.test_lock("/f", 50, 10), nlm4::GRANTED);

        // Zero length locks to end of file
        assert_eq!(one.lock("/f", 1000, 0), nlm4::GRANTED);
        assert_eq!(two.test_lock("/f", u64::MAX - 1, 1), nlm4::DENIED);
        assert_eq!(two.lock("/missing", 0, 1), nlm4::FAILED);
    }

    #[test]
    fn test_locks_disabled_without_nlm() {
        let fs = MemoryFs::new().shared();
        let mut b = MemoryBackend::new(Arc::clone(&fs), 0, false);
        b.create("/f");
        assert_eq!(b.lock("/f", 0, 1), nlm4::DENIED_NOLOCKS);
        assert_eq!(b.test_lock("/f", 0, 1), nlm4::DENIED_NOLOCKS);
    }

    #[test]
    fn test_history_is_opt_in() {
        let quiet = MemoryFs::new().shared();
        backend(&quiet, 0).mkdir("/x");
        assert!(quiet.lock().history().is_empty());

        let recorded = MemoryFs::with_history().shared();
        backend(&recorded, 4).mkdir("/x");
        let history = recorded.lock().history().to_vec();
        assert_eq!(
            history,
            vec![Call {
                client: 4,
                op: "MKDIR",
                path: "/x".into()
            }]
        );
    }
}
