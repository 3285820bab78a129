//! Progress reporting for load runs
//!
//! Provides real-time progress display using indicatif progress bars, and
//! the final human-readable or JSON report.

use crate::runner::{ClientFailure, OpSummary, RunProgress, RunResult};
use console::style;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// Progress reporter that displays run status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &RunProgress) {
        let msg = format!(
            "Ops: {} | Data: {} | Rate: {:.0} ops/s, {:.2} MB/s | Clients: {}/{} running",
            format_number(progress.board.ops),
            format_size(progress.board.bytes, DECIMAL),
            progress.ops_per_second(),
            progress.mb_per_second(),
            progress.board.running,
            progress.total_clients,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Write the per-operation table
fn write_op_table(out: &mut impl Write, ops: &[OpSummary]) -> std::io::Result<()> {
    writeln!(
        out,
        "  {:<12} {:>12} {:>12} {:>12}",
        style("Operation").bold(),
        style("Count").bold(),
        style("AvgLat(ms)").bold(),
        style("MaxLat(ms)").bold()
    )?;
    for op in ops {
        writeln!(
            out,
            "  {:<12} {:>12} {:>12.3} {:>12.3}",
            op.op,
            format_number(op.count),
            op.avg_ms,
            op.max_ms
        )?;
    }
    Ok(())
}

fn write_failures(out: &mut impl Write, failures: &[ClientFailure]) -> std::io::Result<()> {
    for failure in failures {
        writeln!(
            out,
            "  {} client {}: {}",
            style("FAILED").red().bold(),
            failure.client,
            failure.error
        )?;
    }
    Ok(())
}

/// Write a summary of the run
pub fn write_summary(
    out: &mut impl Write,
    result: &RunResult,
    per_client: bool,
) -> std::io::Result<()> {
    let secs = result.duration.as_secs_f64();

    writeln!(out)?;
    if result.succeeded() {
        writeln!(out, "{}", style("Run Complete").green().bold())?;
    } else {
        writeln!(out, "{}", style("Run Failed").red().bold())?;
    }
    writeln!(out, "{}", style("─".repeat(56)).dim())?;
    write_op_table(out, &result.operations)?;
    writeln!(out, "{}", style("─".repeat(56)).dim())?;
    writeln!(
        out,
        "  {} {}",
        style("Operations:").bold(),
        format_number(result.total_ops)
    )?;
    writeln!(
        out,
        "  {} {}",
        style("Data:").bold(),
        format_size(result.total_bytes, DECIMAL)
    )?;
    writeln!(
        out,
        "  {} {:.2} MB/sec with {} clients",
        style("Throughput:").bold(),
        result.throughput_mb_s,
        result.clients
    )?;
    writeln!(
        out,
        "  {} {:.3} ms",
        style("Max latency:").bold(),
        result.max_latency_ms
    )?;
    writeln!(out, "  {} {:.1}s", style("Duration:").bold(), secs)?;

    if per_client {
        for client in &result.per_client {
            writeln!(out)?;
            writeln!(
                out,
                "  {} {} ({} ops, {:.2} MB/sec, max {:.3} ms)",
                style("Client").cyan().bold(),
                client.client,
                format_number(client.ops),
                client.throughput_mb_s,
                client.max_latency_ms
            )?;
            write_op_table(out, &client.operations)?;
        }
    }

    if !result.failures.is_empty() {
        writeln!(out)?;
        write_failures(out, &result.failures)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Print a summary of the run to stdout
pub fn print_summary(result: &RunResult, per_client: bool) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    write_summary(&mut stdout.lock(), result, per_client)
}

/// Print the run as JSON to stdout
pub fn print_json(result: &RunResult) -> serde_json::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, result)?;
    writeln!(out).map_err(serde_json::Error::io)
}

/// Print a header at the start of the run
pub fn print_header(targets: &[String], backend: &str, clients: usize, loadfile: &str) {
    println!();
    println!(
        "{} {}",
        style("nfs-loadgen").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(56)).dim());
    println!("  {} {} ({})", style("Target:").bold(), targets.join(", "), backend);
    println!("  {} {}", style("Clients:").bold(), clients);
    println!("  {} {}", style("Loadfile:").bold(), loadfile);
    println!();
}
