//! Backend fakes shared by the runner tests

use crate::error::{BackendError, BackendResult};
use crate::nfs::{nfs3, Backend, Connector, DirStream, StableHow, StatusCode};

/// Backend answering every primitive with one fixed status
pub struct FixedStatus(pub StatusCode);

impl Backend for FixedStatus {
    fn lookup(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn getattr(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn setattr(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn pathconf(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn readlink(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn create(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn write(&mut self, _: &str, _: u64, _: &[u8], _: StableHow) -> StatusCode {
        self.0
    }
    fn commit(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn read(&mut self, _: &str, _: u64, _: &mut [u8]) -> StatusCode {
        self.0
    }
    fn access(&mut self, _: &str, _: u32) -> StatusCode {
        self.0
    }
    fn mkdir(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn rmdir(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn fsstat(&mut self) -> StatusCode {
        self.0
    }
    fn fsinfo(&mut self) -> StatusCode {
        self.0
    }
    fn symlink(&mut self, _: &str, _: &str) -> StatusCode {
        self.0
    }
    fn remove(&mut self, _: &str) -> StatusCode {
        self.0
    }
    fn readdirplus(&mut self, _: &str) -> Result<DirStream, StatusCode> {
        if self.0 == nfs3::OK {
            Ok(DirStream::new(Vec::new()))
        } else {
            Err(self.0)
        }
    }
    fn link(&mut self, _: &str, _: &str) -> StatusCode {
        self.0
    }
    fn lock(&mut self, _: &str, _: u64, _: u64) -> StatusCode {
        self.0
    }
    fn unlock(&mut self, _: &str, _: u64, _: u64) -> StatusCode {
        self.0
    }
    fn test_lock(&mut self, _: &str, _: u64, _: u64) -> StatusCode {
        self.0
    }
    fn rename(&mut self, _: &str, _: &str) -> StatusCode {
        self.0
    }
}

/// Connector whose every connection attempt is refused
pub struct RefusingConnector;

impl Connector for RefusingConnector {
    fn name(&self) -> &'static str {
        "refusing"
    }

    fn connect(&self, target: &str, _: usize, _: usize) -> BackendResult<Box<dyn Backend>> {
        Err(BackendError::MountFailed {
            server: target.to_string(),
            export: "/".into(),
            reason: "connection refused".into(),
        })
    }
}
