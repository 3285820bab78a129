//! Error types for nfs-loadgen
//!
//! This module defines the error hierarchy that covers:
//! - Backend connection errors
//! - Configuration and CLI errors
//! - Loadfile parsing errors
//! - Directory tree teardown errors
//! - Worker (client) failures, including status mismatches
//!
//! Every worker failure maps to a process exit code so that a benchmark run
//! never reports success over a partially broken run.

use crate::script::OpKind;
use std::path::PathBuf;
use thiserror::Error;

/// Normal completion
pub const EXIT_OK: u8 = 0;

/// Unrecoverable configuration, script or preflight failure
pub const EXIT_FATAL: u8 = 1;

/// A scripted operation returned an unexpected status
pub const EXIT_STATUS_MISMATCH: u8 = 3;

/// Connection, `/clients` setup or teardown failure
pub const EXIT_BACKEND: u8 = 10;

/// Top-level error type for the nfs-loadgen application
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Backend connection errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Loadfile errors
    #[error("Loadfile error: {0}")]
    Script(#[from] ScriptError),

    /// Worker errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            HarnessError::Worker(e) => e.exit_code(),
            _ => EXIT_FATAL,
        }
    }
}

/// Backend connection errors
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// Failed to parse NFS URL
    #[error("Invalid NFS URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Failed to initialize the client context
    #[error("Failed to initialize NFS context: {0}")]
    InitFailed(String),

    /// Mount failed
    #[error("Failed to mount export '{export}' on '{server}': {reason}")]
    MountFailed {
        server: String,
        export: String,
        reason: String,
    },

    /// Backend compiled out or not implemented
    #[error("Backend '{0}' is not available in this build")]
    Unavailable(String),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid client count
    #[error("Invalid client count {count}: must be between 1 and {max}")]
    InvalidClientCount { count: usize, max: usize },

    /// NFS backend selected without any target
    #[error("No NFS target given: use --nfs nfs://server/export[,nfs://...]")]
    MissingTarget,

    /// A target in the comma-separated list does not parse
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Backend named on the command line is not supported
    #[error("Backend '{name}' is not supported by nfs-loadgen")]
    UnsupportedBackend { name: String },

    /// Loadfile missing
    #[error("Loadfile '{path}' does not exist")]
    LoadfileNotFound { path: PathBuf },

    /// Negative or non-finite target rate
    #[error("Invalid target rate {rate}: must be a non-negative number of MB/s")]
    InvalidRate { rate: f64 },

    /// Warmup period not shorter than the time limit
    #[error("Warmup of {warmup}s must be shorter than the time limit of {timelimit}s")]
    InvalidWarmup { warmup: u64, timelimit: u64 },
}

/// Loadfile parsing errors
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Loadfile could not be read
    #[error("Failed to read loadfile '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tokenizer or structural error
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Operation name not in the vocabulary
    #[error("line {line}: unknown operation '{name}'")]
    UnknownOperation { line: usize, name: String },

    /// Wrong number of paths for the operation
    #[error("line {line}: {op} takes {expected} path(s), found {found}")]
    PathCount {
        line: usize,
        op: OpKind,
        expected: usize,
        found: usize,
    },

    /// Too few numeric parameters for the operation
    #[error("line {line}: {op} needs at least {needed} parameter(s), found {found}")]
    MissingParams {
        line: usize,
        op: OpKind,
        needed: usize,
        found: usize,
    },

    /// More than ten numeric parameters
    #[error("line {line}: at most {max} numeric parameters are allowed")]
    TooManyParams { line: usize, max: usize },

    /// Loadfile has no operations
    #[error("Loadfile '{path}' contains no operations")]
    Empty { path: PathBuf },
}

/// Directory tree teardown errors
#[derive(Error, Debug, Clone)]
pub enum CleanupError {
    /// REMOVE or RMDIR of an entry failed
    #[error("Failed to remove object : \"{path}\" {reason} ({status})")]
    RemoveFailed {
        path: String,
        status: u32,
        reason: &'static str,
    },

    /// READDIRPLUS of a directory being emptied failed
    #[error("Failed to read directory \"{path}\" {reason} ({status})")]
    ReadDirFailed {
        path: String,
        status: u32,
        reason: &'static str,
    },

    /// Target still exists after the final RMDIR
    #[error("Directory \"{path}\" not empty. Aborting")]
    NotEmpty { path: String },
}

/// Worker (client) errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Could not connect to the backend
    #[error("Client {id} connect failed: {source}")]
    ConnectFailed {
        id: usize,
        #[source]
        source: BackendError,
    },

    /// Could not create the shared `/clients` directory
    #[error("Client {id} failed to create '{path}' directory. res:{status}")]
    SetupFailed { id: usize, path: String, status: u32 },

    /// A scripted operation returned an unexpected status
    #[error("Client {id} failed at line {line}: {op} returned {actual:#x}, expected {expected}")]
    StatusMismatch {
        id: usize,
        line: usize,
        op: OpKind,
        actual: u32,
        expected: String,
    },

    /// Tree teardown failed
    #[error("Client {id} cleanup failed: {source}")]
    Cleanup {
        id: usize,
        #[source]
        source: CleanupError,
    },

    /// Worker thread could not be spawned
    #[error("Failed to spawn client {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Client {id} panicked: {message}")]
    Panicked { id: usize, message: String },
}

impl WorkerError {
    /// Client id the error belongs to
    pub fn client_id(&self) -> usize {
        match self {
            WorkerError::ConnectFailed { id, .. }
            | WorkerError::SetupFailed { id, .. }
            | WorkerError::StatusMismatch { id, .. }
            | WorkerError::Cleanup { id, .. }
            | WorkerError::SpawnFailed { id, .. }
            | WorkerError::Panicked { id, .. } => *id,
        }
    }

    /// Process exit code a failure of this kind maps to
    pub fn exit_code(&self) -> u8 {
        match self {
            WorkerError::ConnectFailed { .. }
            | WorkerError::SetupFailed { .. }
            | WorkerError::Cleanup { .. } => EXIT_BACKEND,
            WorkerError::StatusMismatch { .. } => EXIT_STATUS_MISMATCH,
            WorkerError::SpawnFailed { .. } | WorkerError::Panicked { .. } => EXIT_FATAL,
        }
    }
}

/// Result type alias for HarnessError
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Result type alias for BackendError
pub type BackendResult<T> = std::result::Result<T, BackendError>;
