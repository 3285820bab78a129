//! Worker execution engine
//!
//! - [`validate`]: status pattern matching
//! - [`stats`]: per-operation statistics
//! - [`deltree`]: recursive subtree removal
//! - [`dispatch`]: one handler per operation kind
//! - [`worker`]: client lifecycle and threads
//! - [`coordinator`]: whole-run orchestration and reporting

pub mod coordinator;
pub mod deltree;
mod dispatch;
pub mod stats;
#[cfg(test)]
mod testing;
pub mod validate;
pub mod worker;

pub use coordinator::{ClientFailure, ClientSummary, LoadCoordinator, OpSummary, RunProgress, RunResult};
pub use deltree::delete_tree;
pub use dispatch::failure_message;
pub use stats::{OpStats, OpStatsTable};
pub use validate::check_status;
pub use worker::{
    client_dir, BoardSnapshot, Client, ClientBoard, ClientPhase, ClientReport, ClientState,
    LiveCounters, CLIENTS_DIR, MAX_IO,
};
