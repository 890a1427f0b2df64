//! Colored CLI display utilities.
//!
//! Reports go to stdout as one JSON document per line so they can be piped.
//! Everything else is a status line on stderr.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::process::{ProcessId, ProcessSummary, ReportEvent};
use crate::report::ReportParseError;
use crate::runner::{Invocation, RunnerKind};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to at most `max_len` characters, adding an ellipsis if
/// truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Render a report event as a single JSON line.
#[must_use]
pub fn report_line(event: &ReportEvent) -> String {
    event.report.value().to_string()
}

/// Print a report to stdout.
pub fn print_report(event: &ReportEvent) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{}", report_line(event));
    let _ = out.flush();
}

/// Print process start information.
pub fn print_process_start(id: &ProcessId, runner: RunnerKind, invocation: &Invocation) {
    eprintln!(
        "{} {} id={} runner={} {}",
        timestamp().dimmed(),
        "[START]".blue().bold(),
        truncate(id.as_str(), 36).dimmed(),
        runner.cyan(),
        truncate(&invocation.to_string(), 120)
    );
}

/// Print a report that could not be decoded.
pub fn print_invalid_report(id: &ProcessId, error: &ReportParseError) {
    eprintln!(
        "{} {} id={} {} ({})",
        timestamp().dimmed(),
        "[INVALID]".yellow().bold(),
        truncate(id.as_str(), 36).dimmed(),
        error.reason,
        truncate(&error.input, 60).dimmed()
    );
}

/// Print the outcome of a finished process.
pub fn print_process_closed(summary: &ProcessSummary) {
    let ts = timestamp();
    let tag = if summary.cancelled {
        "[CANCELLED]".yellow().bold().to_string()
    } else if summary.exit_code == 0 {
        "[EXIT]".green().bold().to_string()
    } else {
        "[EXIT]".red().bold().to_string()
    };
    eprintln!(
        "{} {} id={} code={} reports={} invalid={}",
        ts.dimmed(),
        tag,
        truncate(summary.id.as_str(), 36).dimmed(),
        summary.exit_code,
        summary.reports,
        summary.invalid_reports
    );
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!(
        "{} {} {}",
        timestamp().dimmed(),
        "[ERROR]".red().bold(),
        truncate(message, 400)
    );
}
