//! NFS connection wrapper using libnfs
//!
//! This module provides a safe Rust wrapper around the libnfs synchronous
//! API. Each `NfsConnection` represents a single NFSv3 mount and is NOT
//! thread-safe.
//!
//! Key safety considerations:
//! - One connection per client thread (libnfs contexts are not thread-safe)
//! - RAII for automatic cleanup (unmount + destroy on drop, close on
//!   every opened file handle)
//! - libnfs returns `-errno`; results are mapped back to `nfsstat3`

use crate::config::NfsUrl;
use crate::error::{BackendError, BackendResult};
use crate::nfs::status::{nfs3, nlm4, StatusCode};
use crate::nfs::types::{DirStream, EntryType, NfsDirEntry};
use crate::nfs::{Backend, ConnectOptions, Connector, StableHow};
use std::ffi::{c_int, CStr, CString};
use std::ptr;
use std::time::Duration;
use tracing::debug;

pub use super::bindings as ffi;

/// Map a libnfs `errno` value to the NFSv3 status the server returned
pub fn errno_to_nfs3(errno: c_int) -> StatusCode {
    match errno {
        0 => nfs3::OK,
        libc::EPERM => nfs3::ERR_PERM,
        libc::ENOENT => nfs3::ERR_NOENT,
        libc::EIO => nfs3::ERR_IO,
        libc::ENXIO => nfs3::ERR_NXIO,
        libc::EACCES => nfs3::ERR_ACCES,
        libc::EEXIST => nfs3::ERR_EXIST,
        libc::EXDEV => nfs3::ERR_XDEV,
        libc::ENODEV => nfs3::ERR_NODEV,
        libc::ENOTDIR => nfs3::ERR_NOTDIR,
        libc::EISDIR => nfs3::ERR_ISDIR,
        libc::EINVAL => nfs3::ERR_INVAL,
        libc::EFBIG => nfs3::ERR_FBIG,
        libc::ENOSPC => nfs3::ERR_NOSPC,
        libc::EROFS => nfs3::ERR_ROFS,
        libc::EMLINK => nfs3::ERR_MLINK,
        libc::ENAMETOOLONG => nfs3::ERR_NAMETOOLONG,
        libc::ENOTEMPTY => nfs3::ERR_NOTEMPTY,
        libc::EDQUOT => nfs3::ERR_DQUOT,
        libc::ESTALE => nfs3::ERR_STALE,
        libc::EREMOTE => nfs3::ERR_REMOTE,
        libc::EOPNOTSUPP => nfs3::ERR_NOTSUPP,
        libc::EAGAIN => nfs3::ERR_JUKEBOX,
        _ => nfs3::ERR_SERVERFAULT,
    }
}

/// Map a libnfs `lockf` result to an NLMv4 status
fn errno_to_nlm4(errno: c_int) -> StatusCode {
    match errno {
        0 => nlm4::GRANTED,
        libc::EAGAIN | libc::EACCES => nlm4::DENIED,
        libc::ENOLCK => nlm4::DENIED_NOLOCKS,
        libc::EDEADLK => nlm4::DEADLCK,
        libc::EROFS => nlm4::ROFS,
        libc::ESTALE => nlm4::STALE_FH,
        libc::EFBIG => nlm4::FBIG,
        _ => nlm4::FAILED,
    }
}

fn c_path(path: &str) -> Result<CString, StatusCode> {
    CString::new(path).map_err(|_| nfs3::ERR_INVAL)
}

/// Wrapper around a libnfs context providing the harness primitives
///
/// This struct owns an NFS mount and automatically cleans up on drop. It is
/// Send but NOT Sync - each client thread needs its own.
pub struct NfsConnection {
    /// libnfs context pointer (never null after construction)
    context: *mut ffi::nfs_context,

    /// Server we're connected to
    server: String,

    /// Export path we're mounted on
    export: String,

    /// Whether we're currently mounted
    mounted: bool,

    /// Byte-range locking enabled
    nlm: bool,
}

// NfsConnection can be sent between threads but not shared
unsafe impl Send for NfsConnection {}

/// An open file handle, closed on drop
struct OpenFile<'a> {
    conn: &'a NfsConnection,
    fh: *mut ffi::nfsfh,
}

impl Drop for OpenFile<'_> {
    fn drop(&mut self) {
        unsafe {
            ffi::nfs_close(self.conn.context, self.fh);
        }
    }
}

impl NfsConnection {
    /// Create a new NFS connection from a parsed URL
    ///
    /// This initializes the libnfs context but does not connect.
    /// Call `connect()` to establish the connection.
    pub fn new(url: &NfsUrl) -> BackendResult<Self> {
        let context = unsafe { ffi::nfs_init_context() };

        if context.is_null() {
            return Err(BackendError::InitFailed(
                "nfs_init_context() returned null".into(),
            ));
        }

        unsafe {
            // NFSv3 only
            ffi::nfs_set_version(context, 3);
            ffi::nfs_set_uid(context, libc::getuid() as i32);
            ffi::nfs_set_gid(context, libc::getgid() as i32);
        }

        Ok(Self {
            context,
            server: url.server.clone(),
            export: url.export.clone(),
            mounted: false,
            nlm: false,
        })
    }

    /// Connect and mount the NFS export
    pub fn connect(&mut self, timeout: Duration) -> BackendResult<()> {
        if self.mounted {
            return Ok(());
        }

        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        unsafe {
            ffi::nfs_set_timeout(self.context, timeout_ms);
        }

        let server_cstr =
            CString::new(self.server.as_str()).map_err(|_| BackendError::MountFailed {
                server: self.server.clone(),
                export: self.export.clone(),
                reason: "Server name contains null bytes".into(),
            })?;

        let export_cstr =
            CString::new(self.export.as_str()).map_err(|_| BackendError::MountFailed {
                server: self.server.clone(),
                export: self.export.clone(),
                reason: "Export path contains null bytes".into(),
            })?;

        let result =
            unsafe { ffi::nfs_mount(self.context, server_cstr.as_ptr(), export_cstr.as_ptr()) };

        if result != 0 {
            return Err(BackendError::MountFailed {
                server: self.server.clone(),
                export: self.export.clone(),
                reason: self.get_error(),
            });
        }

        self.mounted = true;
        Ok(())
    }

    /// Create a connected NFS connection in one step
    pub fn connect_to(url: &NfsUrl, options: ConnectOptions) -> BackendResult<Self> {
        let mut conn = Self::new(url)?;
        conn.nlm = options.nlm;
        conn.connect(options.timeout)?;
        Ok(conn)
    }

    /// Get the current error message from libnfs
    fn get_error(&self) -> String {
        let err_ptr = unsafe { ffi::nfs_get_error(self.context) };
        if err_ptr.is_null() {
            return "Unknown error".into();
        }

        let c_str = unsafe { CStr::from_ptr(err_ptr) };
        c_str.to_string_lossy().into_owned()
    }

    /// Status of a libnfs call returning 0 or `-errno`
    fn status(&self, rc: c_int) -> StatusCode {
        if rc >= 0 {
            nfs3::OK
        } else {
            let status = errno_to_nfs3(-rc);
            debug!(rc, status = nfs3::describe(status), error = %self.get_error(), "NFS call failed");
            status
        }
    }

    fn path_call(&self, path: &str, call: impl FnOnce(*const libc::c_char) -> c_int) -> StatusCode {
        match c_path(path) {
            Ok(cpath) => self.status(call(cpath.as_ptr())),
            Err(status) => status,
        }
    }

    fn open(&self, path: &str, flags: c_int) -> Result<OpenFile<'_>, StatusCode> {
        let cpath = c_path(path)?;
        let mut fh: *mut ffi::nfsfh = ptr::null_mut();
        let rc = unsafe { ffi::nfs_open(self.context, cpath.as_ptr(), flags, &mut fh) };
        if rc < 0 || fh.is_null() {
            return Err(self.status(rc.min(-libc::EIO)));
        }
        Ok(OpenFile { conn: self, fh })
    }

    fn lockf(&self, path: &str, offset: u64, len: u64, cmd: ffi::nfs4_lock_op) -> StatusCode {
        if !self.nlm {
            return nlm4::DENIED_NOLOCKS;
        }

        let file = match self.open(path, libc::O_RDWR) {
            Ok(file) => file,
            Err(_) => return nlm4::FAILED,
        };

        let mut current: u64 = 0;
        let rc = unsafe {
            ffi::nfs_lseek(
                self.context,
                file.fh,
                i64::try_from(offset).unwrap_or(i64::MAX),
                libc::SEEK_SET,
                &mut current,
            )
        };
        if rc < 0 {
            return nlm4::FAILED;
        }

        let rc = unsafe { ffi::nfs_lockf(self.context, file.fh, cmd, len) };
        errno_to_nlm4(if rc < 0 { -rc } else { 0 })
    }

    /// Get the server name
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Get the export path
    pub fn export(&self) -> &str {
        &self.export
    }
}

impl Backend for NfsConnection {
    fn lookup(&mut self, path: &str) -> StatusCode {
        let mut st: ffi::nfs_stat_64 = unsafe { std::mem::zeroed() };
        self.path_call(path, |p| unsafe { ffi::nfs_stat64(self.context, p, &mut st) })
    }

    fn getattr(&mut self, path: &str) -> StatusCode {
        let mut st: ffi::nfs_stat_64 = unsafe { std::mem::zeroed() };
        self.path_call(path, |p| unsafe { ffi::nfs_lstat64(self.context, p, &mut st) })
    }

    fn setattr(&mut self, path: &str) -> StatusCode {
        // Null times: set atime and mtime to server time
        self.path_call(path, |p| unsafe {
            ffi::nfs_utimes(self.context, p, ptr::null_mut())
        })
    }

    fn pathconf(&mut self, path: &str) -> StatusCode {
        let mut st: ffi::statvfs = unsafe { std::mem::zeroed() };
        self.path_call(path, |p| unsafe { ffi::nfs_statvfs(self.context, p, &mut st) })
    }

    fn readlink(&mut self, path: &str) -> StatusCode {
        let mut buf = [0 as libc::c_char; libc::PATH_MAX as usize];
        self.path_call(path, |p| unsafe {
            ffi::nfs_readlink(self.context, p, buf.as_mut_ptr(), buf.len() as c_int)
        })
    }

    fn create(&mut self, path: &str) -> StatusCode {
        match self.open(path, libc::O_CREAT | libc::O_TRUNC | libc::O_WRONLY) {
            Ok(_file) => nfs3::OK,
            Err(status) => status,
        }
    }

    fn write(&mut self, path: &str, offset: u64, data: &[u8], stable: StableHow) -> StatusCode {
        let mut flags = libc::O_WRONLY;
        if stable != StableHow::Unstable {
            flags |= libc::O_SYNC;
        }
        let file = match self.open(path, flags) {
            Ok(file) => file,
            Err(status) => return status,
        };

        let rc = unsafe {
            ffi::nfs_pwrite(
                self.context,
                file.fh,
                offset,
                data.len() as u64,
                data.as_ptr().cast(),
            )
        };
        self.status(rc)
    }

    fn commit(&mut self, path: &str) -> StatusCode {
        let file = match self.open(path, libc::O_WRONLY) {
            Ok(file) => file,
            Err(status) => return status,
        };
        let rc = unsafe { ffi::nfs_fsync(self.context, file.fh) };
        self.status(rc)
    }

    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> StatusCode {
        let file = match self.open(path, libc::O_RDONLY) {
            Ok(file) => file,
            Err(status) => return status,
        };
        let rc = unsafe {
            ffi::nfs_pread(
                self.context,
                file.fh,
                offset,
                buf.len() as u64,
                buf.as_mut_ptr().cast(),
            )
        };
        self.status(rc)
    }

    fn access(&mut self, path: &str, mask: u32) -> StatusCode {
        let mode = c_int::try_from(mask).unwrap_or(0);
        self.path_call(path, |p| unsafe { ffi::nfs_access(self.context, p, mode) })
    }

    fn mkdir(&mut self, path: &str) -> StatusCode {
        self.path_call(path, |p| unsafe { ffi::nfs_mkdir(self.context, p) })
    }

    fn rmdir(&mut self, path: &str) -> StatusCode {
        self.path_call(path, |p| unsafe { ffi::nfs_rmdir(self.context, p) })
    }

    fn fsstat(&mut self) -> StatusCode {
        let mut st: ffi::statvfs = unsafe { std::mem::zeroed() };
        self.path_call("/", |p| unsafe { ffi::nfs_statvfs(self.context, p, &mut st) })
    }

    fn fsinfo(&mut self) -> StatusCode {
        // FSINFO is issued by libnfs at mount time; report the negotiated limits
        let readmax = unsafe { ffi::nfs_get_readmax(self.context) };
        let writemax = unsafe { ffi::nfs_get_writemax(self.context) };
        debug!(readmax, writemax, "FSINFO");
        if self.mounted {
            nfs3::OK
        } else {
            nfs3::ERR_STALE
        }
    }

    fn symlink(&mut self, link: &str, target: &str) -> StatusCode {
        let (clink, ctarget) = match (c_path(link), c_path(target)) {
            (Ok(l), Ok(t)) => (l, t),
            _ => return nfs3::ERR_INVAL,
        };
        let rc = unsafe { ffi::nfs_symlink(self.context, ctarget.as_ptr(), clink.as_ptr()) };
        self.status(rc)
    }

    fn remove(&mut self, path: &str) -> StatusCode {
        self.path_call(path, |p| unsafe { ffi::nfs_unlink(self.context, p) })
    }

    fn readdirplus(&mut self, path: &str) -> Result<DirStream, StatusCode> {
        let cpath = c_path(path)?;
        let mut dir: *mut ffi::nfsdir = ptr::null_mut();

        let rc = unsafe { ffi::nfs_opendir(self.context, cpath.as_ptr(), &mut dir) };
        if rc < 0 || dir.is_null() {
            return Err(self.status(rc.min(-libc::EIO)));
        }

        let mut entries = Vec::new();
        loop {
            let dirent = unsafe { ffi::nfs_readdir(self.context, dir) };
            if dirent.is_null() {
                break;
            }
            let d = unsafe { &*dirent };
            let name = if d.name.is_null() {
                String::new()
            } else {
                unsafe { CStr::from_ptr(d.name) }
                    .to_string_lossy()
                    .into_owned()
            };
            entries.push(NfsDirEntry::new(name, EntryType::from_mode(d.mode), d.size));
        }

        unsafe {
            ffi::nfs_closedir(self.context, dir);
        }

        Ok(DirStream::new(entries))
    }

    fn link(&mut self, link: &str, existing: &str) -> StatusCode {
        let (clink, cexisting) = match (c_path(link), c_path(existing)) {
            (Ok(l), Ok(e)) => (l, e),
            _ => return nfs3::ERR_INVAL,
        };
        let rc = unsafe { ffi::nfs_link(self.context, cexisting.as_ptr(), clink.as_ptr()) };
        self.status(rc)
    }

    fn lock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode {
        self.lockf(path, offset, len, ffi::nfs4_lock_op_NFS4_F_TLOCK)
    }

    fn unlock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode {
        self.lockf(path, offset, len, ffi::nfs4_lock_op_NFS4_F_ULOCK)
    }

    fn test_lock(&mut self, path: &str, offset: u64, len: u64) -> StatusCode {
        self.lockf(path, offset, len, ffi::nfs4_lock_op_NFS4_F_TEST)
    }

    fn rename(&mut self, from: &str, to: &str) -> StatusCode {
        let (cfrom, cto) = match (c_path(from), c_path(to)) {
            (Ok(f), Ok(t)) => (f, t),
            _ => return nfs3::ERR_INVAL,
        };
        let rc = unsafe { ffi::nfs_rename(self.context, cfrom.as_ptr(), cto.as_ptr()) };
        self.status(rc)
    }
}

impl Drop for NfsConnection {
    fn drop(&mut self) {
        if !self.context.is_null() {
            if self.mounted {
                unsafe {
                    ffi::nfs_umount(self.context);
                }
                self.mounted = false;
            }

            unsafe {
                ffi::nfs_destroy_context(self.context);
            }
            self.context = ptr::null_mut();
        }
    }
}

/// Connector mounting one libnfs context per client
pub struct LibnfsConnector {
    options: ConnectOptions,
}

impl LibnfsConnector {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }
}

impl Connector for LibnfsConnector {
    fn name(&self) -> &'static str {
        "nfs"
    }

    fn connect(
        &self,
        target: &str,
        client_id: usize,
        num_clients: usize,
    ) -> BackendResult<Box<dyn Backend>> {
        let url = NfsUrl::parse(target)?;
        let conn = NfsConnection::connect_to(&url, self.options)?;
        debug!(
            client = client_id,
            clients = num_clients,
            server = conn.server(),
            export = conn.export(),
            "NFS connection established"
        );
        Ok(Box::new(conn))
    }
}
