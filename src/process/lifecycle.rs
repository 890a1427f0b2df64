//! A single process: report parsing, stray output and lifecycle.
//!
//! [`Process`] performs no I/O. It is fed output chunks and an exit code by
//! whoever drives it, normally the task started by [`Process::spawn`].
//!
//! `chunks` is recorded in the order text is resolved, not strictly in
//! arrival order: stderr is recorded as soon as it arrives, while an open
//! report is only recorded when the process closes. Stderr received in the
//! middle of an unterminated report therefore precedes that report's text.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::pool::ProcessPool;
use crate::report::{Report, ReportDelimiters, ReportParseError, ReportParser, ScanEvent};
use crate::runner::{Invocation, Platform, RunnerKind};

use super::{
    ProcessError, ProcessEvent, ProcessHandle, ProcessId, ProcessOptions, ProcessState,
    ReportEvent,
};

/// Default grace period between SIGTERM and SIGKILL on cancellation.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// One command, its report stream and its diagnostic record.
#[derive(Debug)]
pub struct Process {
    id: ProcessId,
    command: String,
    args: Vec<String>,
    platform: Platform,
    runner: RunnerKind,
    invocation: Invocation,
    pub(super) working_dir: Option<PathBuf>,
    pub(super) env: HashMap<String, String>,
    pub(super) terminate_timeout: Duration,
    created_at: DateTime<Utc>,
    pid: Option<u32>,
    exit_code: Option<i32>,

    parser: ReportParser,
    chunks: Vec<String>,
    report_closed: bool,
    error: Option<String>,
    reports_emitted: usize,
    invalid_reports: usize,

    listeners: Vec<mpsc::UnboundedSender<ProcessEvent>>,
    state: watch::Sender<ProcessState>,
    pub(super) cancel: CancellationToken,
    pool: Option<ProcessPool>,
}

impl Process {
    /// Build an idle process for already resolved options.
    #[must_use]
    pub fn new(
        id: ProcessId,
        runner: RunnerKind,
        options: ProcessOptions,
        delimiters: ReportDelimiters,
    ) -> Self {
        let platform = options.platform.clone().unwrap_or_default();
        let local = runner.invocation(&options.command, &options.args, &platform);
        let invocation = match options.remote() {
            Some(ssh) => ssh.wrap(&local),
            None => local,
        };
        let (state, _) = watch::channel(ProcessState::Idle);

        Self {
            id,
            command: options.command,
            args: options.args,
            platform,
            runner,
            invocation,
            working_dir: options.working_dir,
            env: options.env,
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
            created_at: Utc::now(),
            pid: None,
            exit_code: None,
            parser: ReportParser::new(delimiters),
            chunks: Vec::new(),
            report_closed: true,
            error: None,
            reports_emitted: 0,
            invalid_reports: 0,
            listeners: Vec::new(),
            state,
            cancel: CancellationToken::new(),
            pool: None,
        }
    }

    /// Set the grace period used when cancellation terminates the process.
    #[must_use]
    pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout = timeout;
        self
    }

    /// Link the process to the pool it is registered in, so closing removes
    /// the entry.
    pub(crate) fn attach_pool(&mut self, pool: ProcessPool) {
        self.pool = Some(pool);
    }

    /// Process identifier.
    #[must_use]
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Command text the process was built from.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Extra arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Target platform.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Runner executing the command.
    #[must_use]
    pub fn runner(&self) -> RunnerKind {
        self.runner
    }

    /// The resolved OS invocation, including ssh wrapping.
    #[must_use]
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// OS process id, once running.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit code passed to [`Process::close`], if closed.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Stray output recorded so far, in arrival order.
    #[must_use]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// False while an open delimiter waits for its close delimiter. Keeps its
    /// value after the process closes.
    #[must_use]
    pub fn report_closed(&self) -> bool {
        self.report_closed
    }

    /// Error text, set when the process closed abnormally mid-report.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of reports broadcast so far.
    #[must_use]
    pub fn reports_emitted(&self) -> usize {
        self.reports_emitted
    }

    /// Number of closed reports that failed to decode.
    #[must_use]
    pub fn invalid_reports(&self) -> usize {
        self.invalid_reports
    }

    /// A pool-storable reference to this process.
    #[must_use]
    pub fn handle(&self) -> ProcessHandle {
        ProcessHandle::new(
            self.id.clone(),
            self.command.clone(),
            self.runner,
            self.created_at,
            self.state.subscribe(),
            self.cancel.clone(),
        )
    }

    /// Register a listener. Events are delivered in emission order.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ProcessEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    /// Record that the OS process exists.
    pub fn mark_running(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.transition(ProcessState::Running);
    }

    /// Feed a stdout chunk through the report parser.
    ///
    /// Reports are broadcast and stray text is recorded. A report that fails
    /// to decode is recorded as stray text and broadcast as
    /// [`ProcessEvent::InvalidReport`]; the rest of the chunk is still
    /// processed.
    ///
    /// Returns the number of reports emitted from this chunk.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Report` with the first decoding failure in the
    /// chunk, and `ProcessError::AlreadyClosed` after [`Process::close`].
    pub fn ingest_stdout(&mut self, chunk: &str) -> Result<usize, ProcessError> {
        if self.state().is_terminal() {
            return Err(ProcessError::AlreadyClosed);
        }

        let mut emitted = 0;
        let mut first_error: Option<ReportParseError> = None;

        for event in self.parser.feed(chunk) {
            match event {
                ScanEvent::Stray(text) => self.record_stray(&text),
                ScanEvent::Report(report) => {
                    self.emit_report(report);
                    emitted += 1;
                }
                ScanEvent::Invalid(err) => {
                    tracing::warn!(
                        process_id = %self.id,
                        input = %err.input,
                        error = %err.reason,
                        "Dropping malformed report"
                    );
                    self.invalid_reports += 1;
                    self.chunks.push(err.input.clone());
                    self.broadcast(&ProcessEvent::InvalidReport {
                        process_id: self.id.clone(),
                        error: err.clone(),
                    });
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                ScanEvent::Unterminated(text) => self.chunks.push(text),
            }
        }
        self.report_closed = !self.parser.is_report_open();

        match first_error {
            Some(err) => Err(ProcessError::Report(err)),
            None => Ok(emitted),
        }
    }

    /// Record a stderr chunk verbatim. Stderr is never scanned for reports.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::AlreadyClosed` after [`Process::close`].
    pub fn ingest_stderr(&mut self, chunk: &str) -> Result<(), ProcessError> {
        if self.state().is_terminal() {
            return Err(ProcessError::AlreadyClosed);
        }
        if !chunk.is_empty() {
            self.chunks.push(chunk.to_string());
        }
        Ok(())
    }

    /// Finalize the process with its exit code.
    ///
    /// Flushes the parser: pending stray text is recorded, and an unclosed
    /// report is recorded verbatim, after any stderr that arrived while it
    /// was open. Then the process leaves the pool.
    ///
    /// Closing again re-evaluates the outcome with the new exit code.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Interrupted` when a report was left open and
    /// `exit_code` is non-zero. Its message is the concatenation of
    /// [`Process::chunks`].
    pub fn close(&mut self, exit_code: i32) -> Result<(), ProcessError> {
        let previous = self.state();
        if !previous.is_terminal() {
            for event in self.parser.finish() {
                match event {
                    ScanEvent::Stray(text) => self.record_stray(&text),
                    ScanEvent::Unterminated(text) => self.chunks.push(text),
                    ScanEvent::Report(_) | ScanEvent::Invalid(_) => {}
                }
            }
        }
        self.exit_code = Some(exit_code);

        let result = if !self.report_closed && exit_code != 0 {
            let message = self.chunks.concat();
            tracing::warn!(
                process_id = %self.id,
                exit_code,
                "Process exited with an unterminated report"
            );
            self.error = Some(message.clone());
            self.transition(ProcessState::Errored);
            if previous != ProcessState::Errored {
                self.broadcast(&ProcessEvent::Errored {
                    process_id: self.id.clone(),
                    exit_code: Some(exit_code),
                    message: message.clone(),
                });
            }
            Err(ProcessError::Interrupted { exit_code, message })
        } else {
            tracing::debug!(
                process_id = %self.id,
                exit_code,
                reports = self.reports_emitted,
                "Process closed"
            );
            self.transition(ProcessState::Closed);
            if previous != ProcessState::Closed {
                self.broadcast(&ProcessEvent::Closed {
                    process_id: self.id.clone(),
                    exit_code,
                });
            }
            Ok(())
        };

        self.release();
        result
    }

    /// Mark a process that never started as errored.
    pub(super) fn fail_to_start(&mut self, message: &str) {
        self.chunks.push(message.to_string());
        self.error = Some(message.to_string());
        self.transition(ProcessState::Errored);
        self.broadcast(&ProcessEvent::Errored {
            process_id: self.id.clone(),
            exit_code: None,
            message: message.to_string(),
        });
        self.release();
    }

    fn record_stray(&mut self, text: &str) {
        if let Some(kept) = self.runner.filter_stray(text) {
            self.chunks.push(kept);
        }
    }

    fn emit_report(&mut self, report: Report) {
        self.reports_emitted += 1;
        tracing::trace!(process_id = %self.id, count = self.reports_emitted, "Report received");
        self.broadcast(&ProcessEvent::Report(ReportEvent {
            process_id: self.id.clone(),
            report,
        }));
    }

    fn broadcast(&mut self, event: &ProcessEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn transition(&mut self, new_state: ProcessState) {
        let old = self.state.send_replace(new_state);
        if old != new_state {
            tracing::debug!(process_id = %self.id, from = ?old, to = ?new_state, "State transition");
        }
    }

    fn release(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(&self.handle());
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        self.release();
    }
}
