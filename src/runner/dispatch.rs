//! Operation dispatcher
//!
//! Every operation kind invokes exactly one backend primitive (DELTREE runs
//! the tree deletion walker). The returned status is checked against the
//! loadfile pattern; a mismatch fails the client on the spot.

use crate::error::WorkerError;
use crate::nfs::{nfs3, Backend, StableHow, StatusCode};
use crate::runner::deltree::delete_tree;
use crate::runner::validate::check_status;
use crate::runner::worker::Client;
use crate::script::{OpKind, Operation};
use std::time::Instant;
use tracing::{error, trace};

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl Client {
    /// Run one operation against this client's connection
    pub fn execute(&mut self, op: &Operation) -> Result<(), WorkerError> {
        self.state.set_line(op.line);

        let start = Instant::now();
        let (status, bytes) = self.invoke(op)?;
        let elapsed = start.elapsed();

        if !check_status(&op.expected, status) {
            error!("{}", failure_message(op, status));
            self.state.mark_failed();
            return Err(WorkerError::StatusMismatch {
                id: self.state.id,
                line: op.line,
                op: op.kind,
                actual: status,
                expected: op.expected.clone(),
            });
        }

        self.state.record(op.kind, elapsed, bytes);
        trace!(
            client = self.state.id,
            line = op.line,
            op = %op.kind,
            status,
            micros = elapsed.as_micros() as u64,
            "Operation completed"
        );
        Ok(())
    }

    /// READ/WRITE length after truncation
    fn io_len(&self, requested: i64) -> usize {
        let len = to_u64(requested);
        let len = match self.config.trunc_io {
            Some(max) if len > u64::from(max) => u64::from(max),
            _ => len,
        };
        usize::try_from(len).unwrap_or(usize::MAX)
    }

    /// Issue the primitive; returns its status and the bytes it moved
    fn invoke(&mut self, op: &Operation) -> Result<(StatusCode, u64), WorkerError> {
        let io_len = if op.kind.is_io() {
            self.io_len(op.param(1))
        } else {
            0
        };
        let path = op.path.as_str();
        let path2 = op.path2.as_deref().unwrap_or_default();
        let backend = self.backend.as_mut();

        let status = match op.kind {
            OpKind::Getattr => backend.getattr(path),
            OpKind::Setattr => backend.setattr(path),
            OpKind::Pathconf => backend.pathconf(path),
            OpKind::Readlink => backend.readlink(path),
            OpKind::Lookup => backend.lookup(path),
            OpKind::Create => backend.create(path),
            OpKind::Write => write_chunked(
                backend,
                &self.rw_buf,
                path,
                to_u64(op.param(0)),
                io_len,
                StableHow::from_param(op.param(2)),
            ),
            OpKind::Commit => backend.commit(path),
            OpKind::Read => read_chunked(
                backend,
                &mut self.rw_buf,
                path,
                to_u64(op.param(0)),
                io_len,
            ),
            OpKind::Access => backend.access(path, u32::try_from(op.param(0)).unwrap_or(0)),
            OpKind::Mkdir => backend.mkdir(path),
            OpKind::Rmdir => backend.rmdir(path),
            OpKind::Fsstat => backend.fsstat(),
            OpKind::Fsinfo => backend.fsinfo(),
            OpKind::Symlink => backend.symlink(path, path2),
            OpKind::Remove => backend.remove(path),
            OpKind::Readdirplus => match backend.readdirplus(path) {
                Ok(entries) => {
                    // Drain like a real listing so every entry is fetched
                    let count = entries.count();
                    trace!(path, entries = count, "Directory listed");
                    nfs3::OK
                }
                Err(status) => status,
            },
            OpKind::Link => backend.link(path, path2),
            OpKind::Lock => backend.lock(path, to_u64(op.param(0)), to_u64(op.param(1))),
            OpKind::Unlock => backend.unlock(path, to_u64(op.param(0)), to_u64(op.param(1))),
            OpKind::Test => backend.test_lock(path, to_u64(op.param(0)), to_u64(op.param(1))),
            OpKind::Rename => backend.rename(path, path2),
            OpKind::Deltree => {
                delete_tree(backend, path).map_err(|source| WorkerError::Cleanup {
                    id: self.state.id,
                    source,
                })?;
                nfs3::OK
            }
        };

        Ok((status, io_len as u64))
    }
}

/// WRITE `len` bytes in buffer-sized chunks; stops at the first non-OK reply
fn write_chunked(
    backend: &mut dyn Backend,
    buf: &[u8],
    path: &str,
    offset: u64,
    len: usize,
    stable: StableHow,
) -> StatusCode {
    let mut done = 0;
    loop {
        let chunk = (len - done).min(buf.len());
        let status = backend.write(
            path,
            offset.saturating_add(done as u64),
            &buf[..chunk],
            stable,
        );
        done += chunk;
        if status != nfs3::OK || done >= len {
            return status;
        }
    }
}

/// READ counterpart of [`write_chunked`]
fn read_chunked(
    backend: &mut dyn Backend,
    buf: &mut [u8],
    path: &str,
    offset: u64,
    len: usize,
) -> StatusCode {
    let mut done = 0;
    loop {
        let chunk = (len - done).min(buf.len());
        let status = backend.read(path, offset.saturating_add(done as u64), &mut buf[..chunk]);
        done += chunk;
        if status != nfs3::OK || done >= len {
            return status;
        }
    }
}

/// Diagnostic for an unexpected status
///
/// `[<line>] <OP> "<path>"[->"<path2>"] failed (<hex>) - expected <pattern>`;
/// lock operations also show the byte range.
pub fn failure_message(op: &Operation, status: StatusCode) -> String {
    let paths = match (op.kind.path_count(), &op.path2) {
        (0, _) => String::new(),
        (_, Some(path2)) => format!(" \"{}\"->\"{}\"", op.path, path2),
        (_, None) => format!(" \"{}\"", op.path),
    };
    let range = if op.kind.is_lock() {
        let offset = to_u64(op.param(0));
        format!(" {}-{}", offset, offset.saturating_add(to_u64(op.param(1))))
    } else {
        String::new()
    };

    format!(
        "[{}] {}{}{} failed ({:x}) - expected {}",
        op.line, op.kind, paths, range, status, op.expected
    )
}
