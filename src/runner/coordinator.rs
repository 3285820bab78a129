//! Load coordinator - orchestrates a run across all clients
//!
//! The coordinator is responsible for:
//! - The preflight connection check
//! - Spawning one thread per client
//! - Progress reporting from the live counters
//! - Stopping the remaining clients once one has failed
//! - Joining every client and aggregating the final report

use crate::config::RunConfig;
use crate::error::{BackendError, WorkerError, EXIT_OK};
use crate::nfs::Connector;
use crate::progress::ProgressReporter;
use crate::runner::stats::OpStatsTable;
use crate::runner::worker::{BoardSnapshot, ClientBoard, ClientContext, ClientReport, Worker};
use crate::script::Script;
use chrono::{DateTime, Utc};
use crossbeam_channel::RecvTimeoutError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often progress is refreshed while clients run
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Statistics of one operation kind, as reported
#[derive(Debug, Clone, Serialize)]
pub struct OpSummary {
    pub op: &'static str,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

impl OpSummary {
    fn from_table(table: &OpStatsTable) -> Vec<Self> {
        table
            .iter()
            .map(|(kind, stats)| OpSummary {
                op: kind.name(),
                count: stats.count,
                avg_ms: stats.average().as_secs_f64() * 1e3,
                max_ms: stats.max.as_secs_f64() * 1e3,
            })
            .collect()
    }
}

/// Results of one client that completed
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub client: usize,
    pub ops: u64,
    pub bytes: u64,
    pub throughput_mb_s: f64,
    pub max_latency_ms: f64,
    pub operations: Vec<OpSummary>,
}

impl From<&ClientReport> for ClientSummary {
    fn from(report: &ClientReport) -> Self {
        Self {
            client: report.id,
            ops: report.stats.total_ops(),
            bytes: report.bytes,
            throughput_mb_s: report.throughput_mb(),
            max_latency_ms: report.max_latency.as_secs_f64() * 1e3,
            operations: OpSummary::from_table(&report.stats),
        }
    }
}

/// A client that failed
#[derive(Debug, Clone, Serialize)]
pub struct ClientFailure {
    pub client: usize,
    pub exit_code: u8,
    pub error: String,
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,

    /// Time from spawning the clients until the last one was joined
    #[serde(rename = "duration_secs", serialize_with = "as_secs")]
    pub duration: Duration,

    /// Number of clients
    pub clients: usize,

    /// Whether the run ended without an interrupt
    pub completed: bool,

    /// Successful operations across all clients
    pub total_ops: u64,

    /// READ/WRITE bytes across all clients
    pub total_bytes: u64,

    /// Sum of the clients' post-warmup throughput
    pub throughput_mb_s: f64,

    /// Worst single-operation latency
    pub max_latency_ms: f64,

    /// Aggregate per-operation statistics
    pub operations: Vec<OpSummary>,

    /// Per-client results (successful clients only)
    pub per_client: Vec<ClientSummary>,

    /// Failed clients, by id
    pub failures: Vec<ClientFailure>,

    /// Process exit code for this run
    pub exit_code: u8,
}

fn as_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl RunResult {
    fn build(
        started_at: DateTime<Utc>,
        duration: Duration,
        clients: usize,
        completed: bool,
        reports: &[ClientReport],
        errors: &[WorkerError],
    ) -> Self {
        let mut aggregate = OpStatsTable::new();
        for report in reports {
            aggregate.merge(&report.stats);
        }

        let failures: Vec<ClientFailure> = errors
            .iter()
            .map(|e| ClientFailure {
                client: e.client_id(),
                exit_code: e.exit_code(),
                error: e.to_string(),
            })
            .collect();
        // First failing client by id decides the exit code
        let exit_code = failures.first().map(|f| f.exit_code).unwrap_or(EXIT_OK);

        Self {
            started_at,
            duration,
            clients,
            completed,
            total_ops: aggregate.total_ops(),
            total_bytes: reports.iter().map(|r| r.bytes).sum(),
            throughput_mb_s: reports.iter().map(ClientReport::throughput_mb).sum(),
            max_latency_ms: aggregate.max_latency().as_secs_f64() * 1e3,
            operations: OpSummary::from_table(&aggregate),
            per_client: reports.iter().map(ClientSummary::from).collect(),
            failures,
            exit_code,
        }
    }

    /// True if every client completed
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Live progress for display
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Totals over the live counters
    pub board: BoardSnapshot,

    /// Total clients
    pub total_clients: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl RunProgress {
    /// Operations per second since the start
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.board.ops as f64 / secs
        } else {
            0.0
        }
    }

    /// MB per second since the start
    pub fn mb_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.board.bytes as f64 / 1e6 / secs
        } else {
            0.0
        }
    }
}

/// Coordinates a load run
pub struct LoadCoordinator {
    /// Configuration
    config: Arc<RunConfig>,

    /// Parsed loadfile
    script: Arc<Script>,

    /// Backend connection factory
    connector: Arc<dyn Connector>,

    /// Live counters, one slot per client
    board: Arc<ClientBoard>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl LoadCoordinator {
    /// Create a new coordinator
    pub fn new(config: RunConfig, script: Script, connector: Arc<dyn Connector>) -> Self {
        let board = Arc::new(ClientBoard::new(config.num_clients));
        Self {
            config: Arc::new(config),
            script: Arc::new(script),
            connector,
            board,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Live counters of every client
    pub fn board(&self) -> Arc<ClientBoard> {
        Arc::clone(&self.board)
    }

    /// Connect once to the first target and disconnect again
    pub fn preflight(&self) -> Result<(), BackendError> {
        let target = self.config.target_for(0);
        let connection = self.connector.connect(target, 0, 1)?;
        drop(connection);
        debug!(url = target, backend = self.connector.name(), "Preflight connection ok");
        Ok(())
    }

    /// Run every client to completion
    ///
    /// Client failures do not make this return `Err`; they are collected
    /// into the result, which carries the process exit code.
    pub fn run(self, progress: Option<&ProgressReporter>) -> Result<RunResult, WorkerError> {
        let start = Instant::now();
        let started_at = Utc::now();

        info!(
            clients = self.config.num_clients,
            backend = self.connector.name(),
            loadfile = %self.script.source().display(),
            operations = self.script.len(),
            "Starting load run"
        );

        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        let ctx = ClientContext {
            config: Arc::clone(&self.config),
            connector: Arc::clone(&self.connector),
            script: Arc::clone(&self.script),
            board: Arc::clone(&self.board),
            shutdown: Arc::clone(&self.shutdown),
        };

        let mut workers = Vec::with_capacity(self.config.num_clients);
        for id in 0..self.config.num_clients {
            match Worker::spawn(id, ctx.clone(), done_tx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    self.shutdown.store(true, Ordering::SeqCst);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(e);
                }
            }
        }
        drop(done_tx);
        debug!(count = workers.len(), "Clients spawned");

        let interrupted = self.wait_for_clients(&done_rx, start, progress);

        let mut reports = Vec::with_capacity(workers.len());
        let mut errors = Vec::new();
        for worker in workers {
            match worker.join() {
                Ok(report) => reports.push(report),
                Err(e) => errors.push(e),
            }
        }
        errors.sort_by_key(WorkerError::client_id);

        let duration = start.elapsed();
        let result = RunResult::build(
            started_at,
            duration,
            self.config.num_clients,
            !interrupted,
            &reports,
            &errors,
        );

        info!(
            ops = result.total_ops,
            bytes = result.total_bytes,
            failed = result.failures.len(),
            duration_secs = duration.as_secs(),
            "Load run completed"
        );

        Ok(result)
    }

    /// Wait for every client thread to end; returns true if interrupted
    fn wait_for_clients(
        &self,
        done_rx: &crossbeam_channel::Receiver<usize>,
        start: Instant,
        progress: Option<&ProgressReporter>,
    ) -> bool {
        let mut stopping = false;

        loop {
            match done_rx.recv_timeout(POLL_INTERVAL) {
                Ok(id) => debug!(client = id, "Client thread ended"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let snapshot = self.board.snapshot();
            if let Some(p) = progress {
                p.update(&RunProgress {
                    board: snapshot,
                    total_clients: self.board.len(),
                    elapsed: start.elapsed(),
                });
            }

            if snapshot.failed > 0 && !stopping {
                warn!(failed = snapshot.failed, "Client failed, stopping the remaining clients");
                stopping = true;
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }

        // Only an external shutdown counts as an interrupt
        !stopping && self.shutdown.load(Ordering::SeqCst)
    }
}
