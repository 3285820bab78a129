//! Client (worker) lifecycle
//!
//! Each client:
//! - Runs on its own OS thread with its own backend connection
//! - Ensures `/clients` exists on the export
//! - Replays its copy of the loadfile through the dispatcher
//! - Removes `/clients/client<ID>` when done
//!
//! Clients share nothing mutable except their own slot on the
//! [`ClientBoard`], which the coordinator reads for progress.

use crate::config::RunConfig;
use crate::error::WorkerError;
use crate::nfs::{nfs3, Backend, Connector};
use crate::runner::deltree::delete_tree;
use crate::runner::stats::OpStatsTable;
use crate::script::{OpKind, Operation, Script};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Shared parent directory of every client's subtree
pub const CLIENTS_DIR: &str = "/clients";

/// Size of a client's I/O buffer; longer READ/WRITE requests go out in
/// chunks of this size
pub const MAX_IO: usize = 1024 * 1024;

/// Longest single sleep while throttling, so shutdown stays responsive
const THROTTLE_SLICE: Duration = Duration::from_millis(100);

/// Private subtree of a client
pub fn client_dir(id: usize) -> String {
    format!("{}/client{}", CLIENTS_DIR, id)
}

/// Lifecycle phase of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientPhase {
    Connecting = 0,
    Setup = 1,
    Running = 2,
    CleaningUp = 3,
    Done = 4,
    Failed = 5,
}

impl ClientPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ClientPhase::Connecting,
            1 => ClientPhase::Setup,
            2 => ClientPhase::Running,
            3 => ClientPhase::CleaningUp,
            4 => ClientPhase::Done,
            _ => ClientPhase::Failed,
        }
    }

    /// Done and Failed are terminal
    pub fn is_finished(self) -> bool {
        matches!(self, ClientPhase::Done | ClientPhase::Failed)
    }
}

/// Live counters of one client, written only by that client
#[derive(Debug, Default)]
pub struct LiveCounters {
    phase: AtomicU8,
    ops: AtomicU64,
    bytes: AtomicU64,
    line: AtomicUsize,
}

impl LiveCounters {
    pub fn phase(&self) -> ClientPhase {
        ClientPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn ops(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Loadfile line of the last operation started
    pub fn line(&self) -> usize {
        self.line.load(Ordering::Relaxed)
    }

    fn set_phase(&self, phase: ClientPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn set_line(&self, line: usize) {
        self.line.store(line, Ordering::Relaxed);
    }

    fn record(&self, bytes: u64) {
        self.ops.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Point-in-time totals over every client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub ops: u64,
    pub bytes: u64,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
}

/// One slot of live counters per client
#[derive(Debug)]
pub struct ClientBoard {
    slots: Vec<LiveCounters>,
}

impl ClientBoard {
    pub fn new(num_clients: usize) -> Self {
        Self {
            slots: (0..num_clients).map(|_| LiveCounters::default()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: usize) -> &LiveCounters {
        &self.slots[id]
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.slots
            .iter()
            .fold(BoardSnapshot::default(), |mut snap, slot| {
                snap.ops += slot.ops();
                snap.bytes += slot.bytes();
                match slot.phase() {
                    ClientPhase::Running => snap.running += 1,
                    ClientPhase::Done => snap.finished += 1,
                    ClientPhase::Failed => {
                        snap.finished += 1;
                        snap.failed += 1;
                    }
                    _ => {}
                }
                snap
            })
    }
}

/// Private state of one client
#[derive(Debug)]
pub struct ClientState {
    /// Client id
    pub id: usize,

    /// Number of clients in the run
    pub num_clients: usize,

    /// Set once an operation, setup or cleanup has failed
    pub failed: bool,

    /// Loadfile line of the current operation
    pub line: usize,

    /// Bytes moved by READ and WRITE
    pub bytes: u64,

    /// Value of `bytes` when the warmup period ended
    pub bytes_done_warmup: u64,

    /// Worst latency of any operation
    pub max_latency: Duration,

    /// Per-operation statistics
    pub stats: OpStatsTable,

    board: Arc<ClientBoard>,
}

impl ClientState {
    pub fn new(id: usize, num_clients: usize, board: Arc<ClientBoard>) -> Self {
        Self {
            id,
            num_clients,
            failed: false,
            line: 0,
            bytes: 0,
            bytes_done_warmup: 0,
            max_latency: Duration::ZERO,
            stats: OpStatsTable::new(),
            board,
        }
    }

    /// Every client's live counters, read-only
    pub fn siblings(&self) -> &ClientBoard {
        &self.board
    }

    fn live(&self) -> &LiveCounters {
        self.board.slot(self.id)
    }

    pub fn set_phase(&self, phase: ClientPhase) {
        self.live().set_phase(phase);
    }

    pub fn set_line(&mut self, line: usize) {
        self.line = line;
        self.live().set_line(line);
    }

    /// Account a successful operation
    pub fn record(&mut self, kind: OpKind, elapsed: Duration, bytes: u64) {
        self.stats.record(kind, elapsed);
        self.bytes += bytes;
        self.max_latency = self.max_latency.max(elapsed);
        self.live().record(bytes);
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
        self.set_phase(ClientPhase::Failed);
    }
}

/// Final figures of a client that completed its run
#[derive(Debug, Clone)]
pub struct ClientReport {
    pub id: usize,
    pub stats: OpStatsTable,
    pub bytes: u64,
    pub bytes_done_warmup: u64,
    pub max_latency: Duration,

    /// Time spent in the RUNNING phase
    pub run_time: Duration,

    /// Part of `run_time` after warmup
    pub measured_time: Duration,
}

impl ClientReport {
    /// Post-warmup throughput in MB/sec
    pub fn throughput_mb(&self) -> f64 {
        let secs = self.measured_time.as_secs_f64();
        if secs > 0.0 {
            (self.bytes - self.bytes_done_warmup) as f64 / 1e6 / secs
        } else {
            0.0
        }
    }
}

/// A connected client: its state, connection and I/O buffer
pub struct Client {
    pub(crate) state: ClientState,
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) config: Arc<RunConfig>,
    pub(crate) rw_buf: Vec<u8>,
}

impl Client {
    pub fn new(state: ClientState, backend: Box<dyn Backend>, config: Arc<RunConfig>) -> Self {
        Self {
            state,
            backend,
            config,
            rw_buf: vec![0; MAX_IO],
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Make sure `/clients` exists; another client creating it first is fine
    pub fn setup(&mut self) -> Result<(), WorkerError> {
        self.state.set_phase(ClientPhase::Setup);

        if self.backend.lookup(CLIENTS_DIR) == nfs3::ERR_NOENT {
            let status = self.backend.mkdir(CLIENTS_DIR);
            if status != nfs3::OK && status != nfs3::ERR_EXIST {
                error!(
                    client = self.state.id,
                    "Failed to create '{}' directory. res:{}", CLIENTS_DIR, status
                );
                return Err(WorkerError::SetupFailed {
                    id: self.state.id,
                    path: CLIENTS_DIR.to_string(),
                    status,
                });
            }
        }

        Ok(())
    }

    /// Replay `ops` until the time limit, the end of a single pass with
    /// `run_once`, or shutdown. Returns the RUNNING time and its post-warmup
    /// part.
    pub fn run(
        &mut self,
        ops: &[Operation],
        shutdown: &AtomicBool,
    ) -> Result<(Duration, Duration), WorkerError> {
        self.state.set_phase(ClientPhase::Running);

        let start = Instant::now();
        let time_limit = self.config.time_limit;
        let warmup = self.config.warmup;
        let mut warmup_done = warmup.is_zero();
        let mut passes = 0u64;

        'replay: loop {
            for op in ops {
                if shutdown.load(Ordering::Relaxed) {
                    debug!(client = self.state.id, "Shutdown requested");
                    break 'replay;
                }

                let elapsed = start.elapsed();
                if elapsed >= time_limit {
                    break 'replay;
                }
                if !warmup_done && elapsed >= warmup {
                    self.state.bytes_done_warmup = self.state.bytes;
                    warmup_done = true;
                }

                self.execute(op)?;
                self.throttle(start, shutdown);
            }

            passes += 1;
            if self.config.run_once {
                break;
            }
        }

        let run_time = start.elapsed();
        let measured_time = if warmup_done {
            run_time.saturating_sub(warmup)
        } else {
            run_time
        };

        debug!(
            client = self.state.id,
            passes,
            ops = self.state.stats.total_ops(),
            "Loadfile replay finished"
        );

        Ok((run_time, measured_time))
    }

    /// Sleep while ahead of the configured per-client rate
    fn throttle(&self, start: Instant, shutdown: &AtomicBool) {
        let rate = self.config.target_rate;
        if rate <= 0.0 {
            return;
        }

        let due = Duration::from_secs_f64(self.state.bytes as f64 / (rate * 1e6));
        loop {
            let elapsed = start.elapsed();
            if elapsed >= due
                || elapsed >= self.config.time_limit
                || shutdown.load(Ordering::Relaxed)
            {
                return;
            }
            thread::sleep((due - elapsed).min(THROTTLE_SLICE));
        }
    }

    /// Remove `/clients/client<ID>` unless cleanup is disabled
    pub fn cleanup(&mut self) -> Result<(), WorkerError> {
        if self.config.skip_cleanup {
            debug!(client = self.state.id, "Cleanup skipped");
            return Ok(());
        }

        self.state.set_phase(ClientPhase::CleaningUp);
        let id = self.state.id;
        delete_tree(self.backend.as_mut(), &client_dir(id))
            .map_err(|source| WorkerError::Cleanup { id, source })
    }

    fn report(&self, run_time: Duration, measured_time: Duration) -> ClientReport {
        ClientReport {
            id: self.state.id,
            stats: self.state.stats.clone(),
            bytes: self.state.bytes,
            bytes_done_warmup: self.state.bytes_done_warmup,
            max_latency: self.state.max_latency,
            run_time,
            measured_time,
        }
    }
}

/// Everything a client thread needs, shared read-only
#[derive(Clone)]
pub struct ClientContext {
    pub config: Arc<RunConfig>,
    pub connector: Arc<dyn Connector>,
    pub script: Arc<Script>,
    pub board: Arc<ClientBoard>,
    pub shutdown: Arc<AtomicBool>,
}

/// Tells the coordinator a client thread has ended, even on unwind
struct DoneSignal {
    id: usize,
    tx: Sender<usize>,
}

impl Drop for DoneSignal {
    fn drop(&mut self) {
        let _ = self.tx.send(self.id);
    }
}

/// A client thread
pub struct Worker {
    /// Client ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<Result<ClientReport, WorkerError>>>,
}

impl Worker {
    /// Spawn a new client thread
    pub fn spawn(id: usize, ctx: ClientContext, done: Sender<usize>) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("client-{}", id))
            .spawn(move || {
                let _signal = DoneSignal { id, tx: done };
                run_client(id, &ctx)
            })
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Get client ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the client to finish
    pub fn join(mut self) -> Result<ClientReport, WorkerError> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WorkerError::Panicked {
                    id: self.id,
                    message: "Client thread panicked".into(),
                }),
            },
            None => Err(WorkerError::Panicked {
                id: self.id,
                message: "Client already joined".into(),
            }),
        }
    }
}

/// Full lifecycle of one client
pub fn run_client(id: usize, ctx: &ClientContext) -> Result<ClientReport, WorkerError> {
    let config = &ctx.config;
    let mut state = ClientState::new(id, config.num_clients, Arc::clone(&ctx.board));
    state.set_phase(ClientPhase::Connecting);

    let target = config.target_for(id);
    let backend = match ctx.connector.connect(target, id, config.num_clients) {
        Ok(backend) => backend,
        Err(source) => {
            error!(client = id, url = target, error = %source, "Failed to connect");
            state.mark_failed();
            return Err(WorkerError::ConnectFailed { id, source });
        }
    };
    debug!(client = id, url = target, backend = ctx.connector.name(), "Client connected");

    let mut client = Client::new(state, backend, Arc::clone(config));
    let ops = ctx.script.operations_for(id);

    let result = client
        .setup()
        .and_then(|()| client.run(&ops, &ctx.shutdown))
        .and_then(|times| client.cleanup().map(|()| times));

    match result {
        Ok((run_time, measured_time)) => {
            client.state.set_phase(ClientPhase::Done);
            let running = client.state.siblings().snapshot().running;
            info!(
                client = id,
                ops = client.state.stats.total_ops(),
                still_running = running,
                "Client finished"
            );
            Ok(client.report(run_time, measured_time))
        }
        Err(e) => {
            client.state.mark_failed();
            error!("child {} failed at line {}", id, client.state.line);
            Err(e)
        }
    }
}
