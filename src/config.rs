//! Configuration types for nfs-loadgen
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - NFS URL parsing

use crate::error::{BackendError, ConfigError};
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// Maximum reasonable client count
const MAX_CLIENTS: usize = 512;

/// Regex for parsing NFS URLs
static NFS_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches: nfs://server/export/path or nfs://server:port/export
    Regex::new(r"^nfs://([^:/]+)(:\d+)?(/[^\s]*)$").expect("Invalid NFS URL regex")
});

/// Scripted NFS load generator and status validator
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nfs-loadgen",
    version,
    about = "Scripted NFS load generator and status validator",
    long_about = "Replays a loadfile of NFS operations from N concurrent clients, measures\n\
                  per-operation latency and throughput, and fails any client whose\n\
                  operation returns a status that does not match the loadfile.\n\n\
                  Each client works below /clients/client<ID>, which is removed again\n\
                  when the run ends.",
    after_help = "EXAMPLES:\n    \
        nfs-loadgen --nfs nfs://server/export -c nfs.load 8\n    \
        nfs-loadgen --nfs nfs://a/export,nfs://b/export -c nfs.load -t 60 16\n    \
        nfs-loadgen --backend memory -c nfs.load --run-once 4"
)]
pub struct CliArgs {
    /// Number of concurrent clients
    #[arg(value_name = "CLIENTS", default_value_t = default_clients())]
    pub clients: usize,

    /// Backend to drive
    #[arg(short = 'B', long, value_enum, default_value_t = BackendKind::Nfs)]
    pub backend: BackendKind,

    /// NFS target(s), comma separated; clients are assigned round-robin
    #[arg(long = "nfs", env = "NFS_LOADGEN_TARGETS", value_name = "URLS")]
    pub nfs: Option<String>,

    /// Loadfile to replay
    #[arg(short = 'c', long, value_name = "FILE")]
    pub loadfile: PathBuf,

    /// Run time limit in seconds
    #[arg(short = 't', long, default_value = "600", value_name = "SECS")]
    pub timelimit: u64,

    /// Warmup period in seconds, excluded from throughput
    #[arg(long, default_value = "0", value_name = "SECS")]
    pub warmup: u64,

    /// Target throughput per client in MB/sec (0 = unthrottled)
    #[arg(short = 'R', long, default_value = "0", value_name = "MB_PER_SEC")]
    pub target_rate: f64,

    /// Truncate READ/WRITE requests to this many bytes (0 = no limit)
    #[arg(long, default_value = "0", value_name = "BYTES")]
    pub trunc_io: u32,

    /// Enable byte-range locking through the lock manager
    #[arg(long)]
    pub nlm: bool,

    /// Replay the loadfile once instead of looping until the time limit
    #[arg(long)]
    pub run_once: bool,

    /// Leave /clients/client<ID> in place after the run
    #[arg(long)]
    pub skip_cleanup: bool,

    /// Print results for every client, not only the aggregate
    #[arg(long)]
    pub per_client_results: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub machine_readable: bool,

    /// RPC timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub timeout: u64,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-operation debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_clients() -> usize {
    num_cpus::get()
}

/// Backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// NFSv3 through libnfs
    Nfs,
    /// Simulated in-memory export
    Memory,
    /// SCSI block device
    Scsi,
    /// iSCSI target
    Iscsi,
    /// SMB share
    Smb,
}

impl BackendKind {
    /// Name as given on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Nfs => "nfs",
            BackendKind::Memory => "memory",
            BackendKind::Scsi => "scsi",
            BackendKind::Iscsi => "iscsi",
            BackendKind::Smb => "smb",
        }
    }
}

/// Parsed NFS URL components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsUrl {
    /// NFS server hostname or IP
    pub server: String,

    /// Optional port (default is 2049)
    pub port: Option<u16>,

    /// Export path (must start with /)
    pub export: String,
}

impl NfsUrl {
    /// Parse an NFS URL string
    ///
    /// Accepts formats:
    /// - nfs://server/export
    /// - nfs://server:port/export
    /// - server:/export
    pub fn parse(url: &str) -> Result<Self, BackendError> {
        let url = url.trim();

        if let Some(caps) = NFS_URL_REGEX.captures(url) {
            let server = caps
                .get(1)
                .ok_or_else(|| BackendError::InvalidUrl {
                    url: url.to_string(),
                    reason: "Missing server".into(),
                })?
                .as_str()
                .to_string();

            let port = match caps.get(2) {
                Some(m) => Some(m.as_str().trim_start_matches(':').parse::<u16>().map_err(
                    |e| BackendError::InvalidUrl {
                        url: url.to_string(),
                        reason: format!("Invalid port: {}", e),
                    },
                )?),
                None => None,
            };

            let export = caps
                .get(3)
                .map(|m| Self::normalize_export(m.as_str()))
                .ok_or_else(|| BackendError::InvalidUrl {
                    url: url.to_string(),
                    reason: "Missing export path".into(),
                })?;

            return Ok(Self {
                server,
                port,
                export,
            });
        }

        // Legacy format: server:/export
        if !url.contains("://") {
            if let Some(idx) = url.find(":/") {
                let server = url[..idx].to_string();
                if server.is_empty() {
                    return Err(BackendError::InvalidUrl {
                        url: url.to_string(),
                        reason: "Empty server name".into(),
                    });
                }
                return Ok(Self {
                    server,
                    port: None,
                    export: Self::normalize_export(&url[idx + 1..]),
                });
            }
        }

        Err(BackendError::InvalidUrl {
            url: url.to_string(),
            reason: "Expected format: nfs://server/export or server:/export".into(),
        })
    }

    fn normalize_export(path: &str) -> String {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Format as a connection string for display
    pub fn to_display_string(&self) -> String {
        match self.port {
            Some(p) => format!("nfs://{}:{}{}", self.server, p, self.export),
            None => format!("nfs://{}{}", self.server, self.export),
        }
    }
}

/// Validated runtime configuration, shared read-only by all clients
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Backend to drive
    pub backend: BackendKind,

    /// Connection targets; client N uses `targets[N % targets.len()]`
    pub targets: Vec<String>,

    /// Number of concurrent clients
    pub num_clients: usize,

    /// Loadfile path
    pub loadfile: PathBuf,

    /// Run time limit
    pub time_limit: Duration,

    /// Warmup period
    pub warmup: Duration,

    /// Throttle per client in MB/sec (0 = unthrottled)
    pub target_rate: f64,

    /// READ/WRITE length cap
    pub trunc_io: Option<u32>,

    /// Lock manager enabled
    pub nlm: bool,

    /// Replay the loadfile only once
    pub run_once: bool,

    /// Skip the /clients/client<ID> teardown
    pub skip_cleanup: bool,

    /// Report every client separately
    pub per_client_results: bool,

    /// JSON report
    pub machine_readable: bool,

    /// RPC timeout
    pub timeout: Duration,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl RunConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.clients == 0 || args.clients > MAX_CLIENTS {
            return Err(ConfigError::InvalidClientCount {
                count: args.clients,
                max: MAX_CLIENTS,
            });
        }

        let targets = match args.backend {
            BackendKind::Nfs => {
                let raw = args.nfs.as_deref().ok_or(ConfigError::MissingTarget)?;
                let targets = split_targets(raw);
                if targets.is_empty() {
                    return Err(ConfigError::MissingTarget);
                }
                for target in &targets {
                    NfsUrl::parse(target).map_err(|e| ConfigError::InvalidTarget {
                        target: target.clone(),
                        reason: e.to_string(),
                    })?;
                }
                targets
            }
            BackendKind::Memory => {
                let targets = args.nfs.as_deref().map(split_targets).unwrap_or_default();
                if targets.is_empty() {
                    vec!["memory".to_string()]
                } else {
                    targets
                }
            }
            other => {
                return Err(ConfigError::UnsupportedBackend {
                    name: other.as_str().to_string(),
                })
            }
        };

        if !args.loadfile.exists() {
            return Err(ConfigError::LoadfileNotFound {
                path: args.loadfile.clone(),
            });
        }

        if !args.target_rate.is_finite() || args.target_rate < 0.0 {
            return Err(ConfigError::InvalidRate {
                rate: args.target_rate,
            });
        }

        if args.warmup > 0 && args.warmup >= args.timelimit {
            return Err(ConfigError::InvalidWarmup {
                warmup: args.warmup,
                timelimit: args.timelimit,
            });
        }

        Ok(Self {
            backend: args.backend,
            targets,
            num_clients: args.clients,
            loadfile: args.loadfile,
            time_limit: Duration::from_secs(args.timelimit),
            warmup: Duration::from_secs(args.warmup),
            target_rate: args.target_rate,
            trunc_io: (args.trunc_io > 0).then_some(args.trunc_io),
            nlm: args.nlm,
            run_once: args.run_once,
            skip_cleanup: args.skip_cleanup,
            per_client_results: args.per_client_results,
            machine_readable: args.machine_readable,
            timeout: Duration::from_secs(args.timeout),
            show_progress: !args.quiet && !args.machine_readable,
            verbose: args.verbose,
        })
    }

    /// Configuration for a given backend with defaults everywhere else
    pub fn for_backend(backend: BackendKind, num_clients: usize) -> Self {
        Self {
            backend,
            targets: vec![backend.as_str().to_string()],
            num_clients,
            loadfile: PathBuf::new(),
            time_limit: Duration::from_secs(600),
            warmup: Duration::ZERO,
            target_rate: 0.0,
            trunc_io: None,
            nlm: false,
            run_once: true,
            skip_cleanup: false,
            per_client_results: false,
            machine_readable: false,
            timeout: Duration::from_secs(30),
            show_progress: false,
            verbose: false,
        }
    }

    /// Target assigned to a client (round-robin over the target list)
    pub fn target_for(&self, client_id: usize) -> &str {
        if self.targets.is_empty() {
            return "";
        }
        &self.targets[client_id % self.targets.len()]
    }
}

fn split_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["nfs-loadgen"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_parse_nfs_url_standard() {
        let url = NfsUrl::parse("nfs://server.local/export").unwrap();
        assert_eq!(url.server, "server.local");
        assert_eq!(url.export, "/export");
        assert_eq!(url.port, None);
    }

    #[test]
    fn test_parse_nfs_url_keeps_full_export() {
        let url = NfsUrl::parse("nfs://server/volumes/uuid/").unwrap();
        assert_eq!(url.export, "/volumes/uuid");
        assert_eq!(url.to_display_string(), "nfs://server/volumes/uuid");
    }

    #[test]
    fn test_parse_nfs_url_with_port() {
        let url = NfsUrl::parse("nfs://server:2049/export").unwrap();
        assert_eq!(url.server, "server");
        assert_eq!(url.port, Some(2049));
        assert_eq!(url.to_display_string(), "nfs://server:2049/export");
    }

    #[test]
    fn test_parse_legacy_format() {
        let url = NfsUrl::parse("192.168.1.100:/data").unwrap();
        assert_eq!(url.server, "192.168.1.100");
        assert_eq!(url.export, "/data");
    }

    #[test]
    fn test_parse_invalid_url() {
        assert!(NfsUrl::parse("invalid").is_err());
        assert!(NfsUrl::parse("://server/export").is_err());
        assert!(NfsUrl::parse(":/export").is_err());
        assert!(NfsUrl::parse("nfs://server:99999/export").is_err());
    }

    #[test]
    fn test_target_round_robin() {
        let mut config = RunConfig::for_backend(BackendKind::Nfs, 5);
        config.targets = split_targets("nfs://a/e, nfs://b/e,,");
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.target_for(0), "nfs://a/e");
        assert_eq!(config.target_for(1), "nfs://b/e");
        assert_eq!(config.target_for(2), "nfs://a/e");
        assert_eq!(config.target_for(3), "nfs://b/e");
    }

    #[test]
    fn test_from_args_validation() {
        let mut loadfile = tempfile::NamedTempFile::new().unwrap();
        writeln!(loadfile, "FSSTAT3 *").unwrap();
        let path = loadfile.path().to_str().unwrap().to_string();

        let config = RunConfig::from_args(args(&[
            "--nfs",
            "nfs://server/export,server2:/export",
            "-c",
            &path,
            "--trunc-io",
            "65536",
            "4",
        ]))
        .unwrap();
        assert_eq!(config.num_clients, 4);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.trunc_io, Some(65536));
        assert_eq!(config.time_limit, Duration::from_secs(600));

        let err = RunConfig::from_args(args(&["-c", &path, "4"])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTarget));

        let err = RunConfig::from_args(args(&["--nfs", "bogus", "-c", &path, "4"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTarget { .. }));

        let err = RunConfig::from_args(args(&["-B", "smb", "-c", &path, "4"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedBackend { .. }));

        let err = RunConfig::from_args(args(&["-B", "memory", "-c", &path, "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidClientCount { .. }));

        let err = RunConfig::from_args(args(&[
            "-B", "memory", "-c", &path, "-t", "10", "--warmup", "10", "2",
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWarmup { .. }));

        let err = RunConfig::from_args(args(&["-B", "memory", "-c", "/no/such/loadfile", "2"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::LoadfileNotFound { .. }));

        let config = RunConfig::from_args(args(&["-B", "memory", "-c", &path, "2"])).unwrap();
        assert_eq!(config.target_for(1), "memory");
        assert_eq!(config.trunc_io, None);
    }
}
