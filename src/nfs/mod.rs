//! Backend access module
//!
//! A backend is the filesystem-protocol client a worker drives. The harness
//! only needs the primitive set below; each primitive returns the protocol
//! status code of the reply and never panics on a server-side error.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Connector (shared)                   │
//! │  - One per run, Send + Sync                          │
//! │  - connect(target, client_id, num_clients)           │
//! └──────────────────────────┬──────────────────────────┘
//!                            │ one per worker thread
//!                            ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                 Box<dyn Backend>                     │
//! │  - Owned by exactly one worker                       │
//! │  - RAII disconnect on drop                           │
//! │  - READDIRPLUS yields a DirStream                    │
//! └──────────────────────────┬──────────────────────────┘
//!              ┌─────────────┴─────────────┐
//!              ▼                           ▼
//!     ┌─────────────────┐        ┌──────────────────┐
//!     │  MemoryBackend  │        │  libnfs (C FFI)  │
//!     │  simulated tree │        │  feature=libnfs  │
//!     └─────────────────┘        └──────────────────┘
//! ```

#[cfg(feature = "libnfs")]
mod bindings;
#[cfg(feature = "libnfs")]
mod connection;
pub mod memory;
pub mod status;
pub mod types;

#[cfg(feature = "libnfs")]
pub use connection::{LibnfsConnector, NfsConnection};
pub use memory::{MemoryBackend, MemoryConnector, MemoryFs, SharedFs};
pub use status::{nfs3, nlm4, StatusCode};
pub use types::{join_path, DirStream, EntryType, NfsDirEntry};

use crate::config::{BackendKind, RunConfig};
use crate::error::{BackendError, BackendResult};
use std::sync::Arc;
use std::time::Duration;

/// WRITE stability level (`stable_how` in NFSv3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableHow {
    Unstable,
    DataSync,
    FileSync,
}

impl StableHow {
    /// Convert from a loadfile parameter; unknown values are unstable
    pub fn from_param(value: i64) -> Self {
        match value {
            1 => StableHow::DataSync,
            2 => StableHow::FileSync,
            _ => StableHow::Unstable,
        }
    }
}

/// The primitive set a worker drives
///
/// Filesystem primitives return `nfsstat3` codes, lock primitives return
/// `nlm4_stats` codes.
pub trait Backend {
    fn lookup(&mut self, path: &str) -> StatusCode;
    fn getattr(&mut self, path: &str) -> StatusCode;
    fn setattr(&mut self, path: &str) -> StatusCode;
    fn pathconf(&mut self, path: &str) -> StatusCode;
    fn readlink(&mut self, path: &str) -> StatusCode;
    fn create(&mut self, path: &str) -> StatusCode;
    fn write(&mut self, path: &str, offset: u64, data: &[u8], stable: StableHow) -> StatusCode;
    fn commit(&mut self, path: &str) -> StatusCode;
    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> StatusCode;
    fn access(&mut self, path: &str, mask: u32) -> StatusCode;
    fn mkdir(&mut self, path: &str) -> StatusCode;
    fn rmdir(&mut self, path: &str) -> StatusCode;
    fn fsstat(&mut self) -> StatusCode;
    fn fsinfo(&mut self) -> StatusCode;

    /// Create symlink `link` pointing at `target`
    fn symlink(&mut self, link: &str, target: &str) -> StatusCode;
    fn remove(&mut self, path: &str) -> StatusCode;

    /// Enumerate a directory, including the "." and ".." entries
    fn readdirplus(&mut self, path: &str) -> Result<DirStream, StatusCode>;

    /// Create hard link `link` to the existing object `existing`
    fn link(&mut self, link: &str, existing: &str) -> StatusCode;
    fn lock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode;
    fn unlock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode;
    fn test_lock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode;
    fn rename(&mut self, from: &str, to: &str) -> StatusCode;
}

/// Options every connector is built with
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    /// RPC timeout
    pub timeout: Duration,

    /// Whether byte-range locking through the lock manager is enabled
    pub nlm: bool,
}

/// Factory for per-worker backend connections
pub trait Connector: Send + Sync {
    /// Backend name, for logging
    fn name(&self) -> &'static str;

    /// Open one connection for `client_id` of `num_clients`
    fn connect(
        &self,
        target: &str,
        client_id: usize,
        num_clients: usize,
    ) -> BackendResult<Box<dyn Backend>>;
}

/// Build the connector selected by the configuration
pub fn connector_for(config: &RunConfig) -> BackendResult<Arc<dyn Connector>> {
    let options = ConnectOptions {
        timeout: config.timeout,
        nlm: config.nlm,
    };

    match config.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryConnector::new(options))),
        #[cfg(feature = "libnfs")]
        BackendKind::Nfs => Ok(Arc::new(LibnfsConnector::new(options))),
        #[cfg(not(feature = "libnfs"))]
        BackendKind::Nfs => Err(BackendError::Unavailable(
            "nfs (rebuild with --features libnfs)".into(),
        )),
        other => Err(BackendError::Unavailable(other.as_str().into())),
    }
}
