//! nfs-loadgen - Scripted NFS Load Generator and Status Validator
//!
//! Replays a loadfile of NFS operations from many concurrent clients,
//! measuring latency and throughput, and verifying that every operation
//! returns the status the loadfile expects.
//!
//! # Features
//!
//! - **Fail-fast validation**: a status that does not match its pattern
//!   (`*` or an exact `0x` hex value) fails the client with its loadfile line.
//!
//! - **One thread per client**: each client owns its connection, statistics
//!   table and I/O buffer; only atomic live counters are shared.
//!
//! - **Self-cleaning**: every client works below `/clients/client<ID>` and
//!   removes that subtree with a depth-first walk when it is done.
//!
//! - **Pluggable backends**: libnfs (feature `libnfs`) or a simulated
//!   in-memory export for dry runs and tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   parse    ┌──────────────┐
//! │   Loadfile   │ ─────────▶ │    Script    │ (shared, read-only)
//! └──────────────┘            └──────┬───────┘
//!                                    │ operations_for(id)
//!         ┌──────────────────────────┼──────────────────────────┐
//!         ▼                          ▼                          ▼
//! ┌──────────────┐           ┌──────────────┐           ┌──────────────┐
//! │   Client 0   │           │   Client 1   │    ...    │  Client N-1  │
//! │  dispatcher  │           │  dispatcher  │           │  dispatcher  │
//! │  validator   │           │  validator   │           │  validator   │
//! │  stats table │           │  stats table │           │  stats table │
//! └──────┬───────┘           └──────┬───────┘           └──────┬───────┘
//!        │ Backend                  │                          │
//!        ▼                          ▼                          ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      NFS export  (/clients)                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Eight clients against one server for the default 600 seconds
//! nfs-loadgen --nfs nfs://server/export -c nfs.load 8
//!
//! # Single pass against the simulated export
//! nfs-loadgen --backend memory -c nfs.load --run-once 4
//! ```

pub mod config;
pub mod error;
pub mod nfs;
pub mod progress;
pub mod runner;
pub mod script;

pub use config::{BackendKind, CliArgs, NfsUrl, RunConfig};
pub use error::{HarnessError, Result};
pub use runner::{check_status, delete_tree, LoadCoordinator, RunResult};
pub use script::{OpKind, Operation, Script};
