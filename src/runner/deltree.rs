//! Recursive directory removal
//!
//! The backend has no recursive delete, so a subtree is removed depth-first
//! with post-order deletion: every directory is emptied through READDIRPLUS
//! before RMDIR is issued on it. Each recursion level owns a [`WalkContext`]
//! that borrows the connection and owns the directory path; it is dropped on
//! every exit path, error returns included.

use crate::error::CleanupError;
use crate::nfs::{join_path, nfs3, Backend, NfsDirEntry};
use tracing::{debug, error};

/// State of one recursion level
struct WalkContext<'a> {
    backend: &'a mut dyn Backend,
    dir: String,
}

impl<'a> WalkContext<'a> {
    fn new(backend: &'a mut dyn Backend, dir: impl Into<String>) -> Self {
        Self {
            backend,
            dir: dir.into(),
        }
    }

    /// Remove everything below `self.dir`, leaving the directory itself
    fn empty(mut self) -> Result<(), CleanupError> {
        let entries = self.backend.readdirplus(&self.dir).map_err(|status| {
            error!(path = %self.dir, status, "Failed to read directory during cleanup");
            CleanupError::ReadDirFailed {
                path: self.dir.clone(),
                status,
                reason: nfs3::describe(status),
            }
        })?;

        entries
            .filter(|entry| !entry.is_special())
            .try_for_each(|entry| self.remove_entry(&entry))
    }

    fn remove_entry(&mut self, entry: &NfsDirEntry) -> Result<(), CleanupError> {
        let path = join_path(&self.dir, &entry.name);

        let status = if entry.entry_type.is_dir() {
            WalkContext::new(&mut *self.backend, path.as_str()).empty()?;
            self.backend.rmdir(&path)
        } else {
            self.backend.remove(&path)
        };

        if status != nfs3::OK {
            let reason = nfs3::describe(status);
            error!("Failed to remove object : \"{}\" {} ({})", path, reason, status);
            return Err(CleanupError::RemoveFailed {
                path,
                status,
                reason,
            });
        }

        debug!(path = %path, "Removed");
        Ok(())
    }
}

/// Delete the subtree rooted at `path`
///
/// A missing path is a no-op. After the walk the path must be gone; if a
/// final LOOKUP still finds it the walk fails with
/// [`CleanupError::NotEmpty`].
pub fn delete_tree(backend: &mut dyn Backend, path: &str) -> Result<(), CleanupError> {
    if backend.lookup(path) == nfs3::ERR_NOENT {
        return Ok(());
    }

    WalkContext::new(&mut *backend, path).empty()?;

    // Judged by the final lookup below
    let _ = backend.rmdir(path);

    if backend.lookup(path) != nfs3::ERR_NOENT {
        error!("Directory \"{}\" not empty. Aborting", path);
        return Err(CleanupError::NotEmpty {
            path: path.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfs::{
        DirStream, EntryType, MemoryBackend, MemoryFs, StableHow, StatusCode,
    };
    use std::collections::{HashMap, HashSet};

    /// Backend serving a fixed tree in listing order, logging every call
    #[derive(Default)]
    struct ListedTree {
        listings: HashMap<String, Vec<(&'static str, bool)>>,
        files: HashSet<String>,
        gone: HashSet<String>,
        calls: Vec<String>,
        fail_remove: Option<String>,
        ignore_rmdir: Option<String>,
    }

    impl ListedTree {
        fn dir(mut self, path: &str, entries: &[(&'static str, bool)]) -> Self {
            self.listings.insert(path.to_string(), entries.to_vec());
            for (name, is_dir) in entries {
                if !is_dir {
                    self.files.insert(join_path(path, name));
                }
            }
            self
        }

        fn exists(&self, path: &str) -> bool {
            !self.gone.contains(path)
                && (self.listings.contains_key(path) || self.files.contains(path))
        }

        fn removals(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|c| c.strip_prefix("rm ").or_else(|| c.strip_prefix("rmdir ")))
                .collect()
        }
    }

    impl Backend for ListedTree {
        fn lookup(&mut self, path: &str) -> StatusCode {
            self.calls.push(format!("lookup {}", path));
            if self.exists(path) {
                nfs3::OK
            } else {
                nfs3::ERR_NOENT
            }
        }
        fn getattr(&mut self, _: &str) -> StatusCode { nfs3::OK }
        fn setattr(&mut self, _: &str) -> StatusCode { nfs3::OK }
        fn pathconf(&mut self, _: &str) -> StatusCode { nfs3::OK }
        fn readlink(&mut self, _: &str) -> StatusCode { nfs3::OK }
        fn create(&mut self, _: &str) -> StatusCode { nfs3::OK }
        fn write(&mut self, _: &str, _: u64, _: &[u8], _: StableHow) -> StatusCode { nfs3::OK }
        fn commit(&mut self, _: &str) -> StatusCode { nfs3::OK }
        fn read(&mut self, _: &str, _: u64, _: &mut [u8]) -> StatusCode { nfs3::OK }
        fn access(&mut self, _: &str, _: u32) -> StatusCode { nfs3::OK }
        fn mkdir(&mut self, _: &str) -> StatusCode { nfs3::OK }
        fn rmdir(&mut self, path: &str) -> StatusCode {
            self.calls.push(format!("rmdir {}", path));
            if self.ignore_rmdir.as_deref() == Some(path) {
                return nfs3::OK;
            }
            let busy = self.listings.get(path).is_some_and(|entries| {
                entries
                    .iter()
                    .any(|(name, _)| self.exists(&join_path(path, name)))
            });
            if busy {
                return nfs3::ERR_NOTEMPTY;
            }
            self.gone.insert(path.to_string());
            nfs3::OK
        }
        fn fsstat(&mut self) -> StatusCode { nfs3::OK }
        fn fsinfo(&mut self) -> StatusCode { nfs3::OK }
        fn symlink(&mut self, _: &str, _: &str) -> StatusCode { nfs3::OK }
        fn remove(&mut self, path: &str) -> StatusCode {
            self.calls.push(format!("rm {}", path));
            if self.fail_remove.as_deref() == Some(path) {
                return nfs3::ERR_ACCES;
            }
            self.gone.insert(path.to_string());
            nfs3::OK
        }
        fn readdirplus(&mut self, path: &str) -> Result<DirStream, StatusCode> {
            self.calls.push(format!("readdir {}", path));
            let listing = self.listings.get(path).ok_or(nfs3::ERR_NOTDIR)?;
            let mut entries = vec![
                NfsDirEntry::new(".", EntryType::Directory, 0),
                NfsDirEntry::new("..", EntryType::Directory, 0),
            ];
            entries.extend(listing.iter().map(|(name, is_dir)| {
                let kind = if *is_dir { EntryType::Directory } else { EntryType::File };
                NfsDirEntry::new(*name, kind, 0)
            }));
            Ok(DirStream::new(entries))
        }
        fn link(&mut self, _: &str, _: &str) -> StatusCode { nfs3::OK }
        fn lock(&mut self, _: &str, _: u64, _: u64) -> StatusCode { nfs3::OK }
        fn unlock(&mut self, _: &str, _: u64, _: u64) -> StatusCode { nfs3::OK }
        fn test_lock(&mut self, _: &str, _: u64, _: u64) -> StatusCode { nfs3::OK }
        fn rename(&mut self, _: &str, _: &str) -> StatusCode { nfs3::OK }
    }

    fn sample_tree() -> ListedTree {
        ListedTree::default()
            .dir("/clients/5", &[("b", true), ("a", false)])
            .dir("/clients/5/b", &[("c", false)])
    }

    #[test]
    fn test_post_order_removal() {
        let mut tree = sample_tree();
        delete_tree(&mut tree, "/clients/5").unwrap();

        assert_eq!(
            tree.removals(),
            vec!["/clients/5/b/c", "/clients/5/b", "/clients/5/a", "/clients/5"]
        );
        assert_eq!(tree.lookup("/clients/5"), nfs3::ERR_NOENT);
        // Self and parent references are never touched
        assert!(!tree.calls.iter().any(|c| c.ends_with("/.") || c.ends_with("/..")));
    }

    #[test]
    fn test_missing_path_is_idempotent() {
        let mut tree = ListedTree::default();
        delete_tree(&mut tree, "/clients/9").unwrap();
        delete_tree(&mut tree, "/clients/9").unwrap();
        assert_eq!(tree.calls, vec!["lookup /clients/9", "lookup /clients/9"]);
    }

    #[test]
    fn test_remove_failure_aborts_walk() {
        let mut tree = sample_tree();
        tree.fail_remove = Some("/clients/5/b/c".into());

        let err = delete_tree(&mut tree, "/clients/5").unwrap_err();
        match err {
            CleanupError::RemoveFailed { path, status, .. } => {
                assert_eq!(path, "/clients/5/b/c");
                assert_eq!(status, nfs3::ERR_ACCES);
            }
            other => panic!("unexpected error: {}", other),
        }
        // Nothing after the failure was attempted
        assert_eq!(tree.removals(), vec!["/clients/5/b/c"]);
    }

    #[test]
    fn test_surviving_target_is_not_empty() {
        let mut tree = sample_tree();
        tree.ignore_rmdir = Some("/clients/5".into());

        let err = delete_tree(&mut tree, "/clients/5").unwrap_err();
        match err {
            CleanupError::NotEmpty { ref path } => assert_eq!(path, "/clients/5"),
            ref other => panic!("unexpected error: {}", other),
        }
        assert_eq!(err.to_string(), "Directory \"/clients/5\" not empty. Aborting");
        // Children went first; only the final check found the target
        assert_eq!(
            tree.removals(),
            vec!["/clients/5/b/c", "/clients/5/b", "/clients/5/a", "/clients/5"]
        );
        assert_eq!(tree.calls.last().map(String::as_str), Some("lookup /clients/5"));
    }

    #[test]
    fn test_top_level_not_a_directory() {
        let mut backend = MemoryBackend::new(MemoryFs::new().shared(), 0, false);
        assert_eq!(backend.mkdir("/clients"), nfs3::OK);
        assert_eq!(backend.create("/clients/f"), nfs3::OK);

        let err = delete_tree(&mut backend, "/clients/f").unwrap_err();
        assert!(matches!(
            err,
            CleanupError::ReadDirFailed { status: nfs3::ERR_NOTDIR, .. }
        ));
    }

    #[test]
    fn test_deep_tree_on_memory_backend() {
        let shared = MemoryFs::new().shared();
        let mut backend = MemoryBackend::new(shared.clone(), 3, false);

        for dir in ["/clients", "/clients/client3", "/clients/client3/x", "/clients/client3/x/y"] {
            assert_eq!(backend.mkdir(dir), nfs3::OK);
        }
        assert_eq!(backend.mkdir("/clients/client3/empty"), nfs3::OK);
        for file in ["/clients/client3/f", "/clients/client3/x/g", "/clients/client3/x/y/h"] {
            assert_eq!(backend.create(file), nfs3::OK);
        }
        assert_eq!(backend.symlink("/clients/client3/x/l", "/clients/client3/f"), nfs3::OK);
        assert_eq!(backend.mkdir("/clients/client4"), nfs3::OK);

        delete_tree(&mut backend, "/clients/client3").unwrap();

        assert_eq!(backend.lookup("/clients/client3"), nfs3::ERR_NOENT);
        assert_eq!(backend.lookup("/clients"), nfs3::OK);
        assert_eq!(backend.lookup("/clients/client4"), nfs3::OK);
    }
}
