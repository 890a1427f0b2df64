//! Spawning and driving OS processes.
//!
//! [`Process::spawn`] starts the resolved invocation and moves the process
//! into a driver task. The driver is the process's only owner: it feeds
//! stdout and stderr chunks in arrival order, honours cancellation, and
//! closes the process with the exit code once both pipes are drained.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::{Process, ProcessError, ProcessHandle, ProcessId, ProcessState, SpawnError};

/// Size of the buffer used for each pipe read.
pub const READ_BUFFER_SIZE: usize = 8192;

/// Exit code recorded when the process was killed by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// Final record of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Process identifier.
    pub id: ProcessId,
    /// Exit code, or [`SIGNAL_EXIT_CODE`] when killed by a signal.
    pub exit_code: i32,
    /// Final lifecycle state.
    pub state: ProcessState,
    /// Number of reports emitted.
    pub reports: usize,
    /// Number of closed reports that failed to decode.
    pub invalid_reports: usize,
    /// Stray output recorded during the run.
    pub chunks: Vec<String>,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl ProcessSummary {
    /// Returns true if the process exited with code 0 and no report failed
    /// to decode.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.invalid_reports == 0
    }
}

/// A process running on its driver task.
#[derive(Debug)]
pub struct RunningProcess {
    handle: ProcessHandle,
    task: JoinHandle<Result<ProcessSummary, ProcessError>>,
}

impl RunningProcess {
    /// Shared reference to the running process.
    #[must_use]
    pub fn handle(&self) -> &ProcessHandle {
        &self.handle
    }

    /// Process identifier.
    #[must_use]
    pub fn id(&self) -> &ProcessId {
        self.handle.id()
    }

    /// Request termination.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Wait for the driver to finish.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Interrupted` when the process exited non-zero
    /// with a report left open, `ProcessError::Io` if waiting on the child
    /// failed, and `ProcessError::Join` if the driver task panicked.
    pub async fn wait(self) -> Result<ProcessSummary, ProcessError> {
        self.task.await?
    }
}

impl Process {
    /// Start the OS process and hand ownership to a driver task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::AlreadyStarted` if the process is not idle and
    /// `ProcessError::Spawn` if the program cannot be started. A process that
    /// fails to start is marked errored and leaves the pool.
    pub fn spawn(mut self) -> Result<RunningProcess, ProcessError> {
        if self.state() != ProcessState::Idle {
            return Err(ProcessError::AlreadyStarted);
        }

        let invocation = self.invocation().clone();
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.env);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = SpawnError::from_io(&invocation.program, e);
                tracing::error!(process_id = %self.id(), error = %err, "Failed to spawn process");
                self.fail_to_start(&err.to_string());
                return Err(err.into());
            }
        };

        let Some(stdout) = child.stdout.take() else {
            self.fail_to_start("Process stdout not available");
            return Err(ProcessError::NoStdout);
        };
        let stderr = child.stderr.take();

        self.mark_running(child.id());
        tracing::info!(
            process_id = %self.id(),
            pid = ?self.pid(),
            runner = %self.runner(),
            command = %invocation,
            "Process started"
        );

        let handle = self.handle();
        let task = tokio::spawn(drive(self, child, stdout, stderr));
        Ok(RunningProcess { handle, task })
    }
}

async fn drive<O, E>(
    mut process: Process,
    mut child: Child,
    mut stdout: O,
    mut stderr: Option<E>,
) -> Result<ProcessSummary, ProcessError>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let cancel = process.cancel.clone();
    let grace = process.terminate_timeout;

    let mut out_buf = vec![0u8; READ_BUFFER_SIZE];
    let mut err_buf = vec![0u8; READ_BUFFER_SIZE];
    let mut out_text = Utf8Decoder::default();
    let mut err_text = Utf8Decoder::default();
    let mut stdout_open = true;
    let mut stderr_open = stderr.is_some();
    let mut cancelled = false;

    while stdout_open || stderr_open {
        tokio::select! {
            () = cancel.cancelled(), if !cancelled => {
                cancelled = true;
                tracing::info!(process_id = %process.id(), "Cancelling process");
                if let Err(e) = terminate(&mut child, grace).await {
                    tracing::warn!(process_id = %process.id(), error = %e, "Failed to terminate process");
                }
            }
            read = stdout.read(&mut out_buf), if stdout_open => {
                let text = match read {
                    Ok(0) => {
                        stdout_open = false;
                        out_text.finish()
                    }
                    Ok(n) => out_text.decode(&out_buf[..n]),
                    Err(e) => {
                        tracing::warn!(process_id = %process.id(), error = %e, "Failed to read stdout");
                        stdout_open = false;
                        out_text.finish()
                    }
                };
                if !text.is_empty() {
                    if let Err(e) = process.ingest_stdout(&text) {
                        // Already recorded and broadcast as an invalid report.
                        tracing::trace!(process_id = %process.id(), error = %e, "Continuing after invalid report");
                    }
                }
            }
            read = read_optional(&mut stderr, &mut err_buf), if stderr_open => {
                let text = match read {
                    Ok(0) => {
                        stderr_open = false;
                        err_text.finish()
                    }
                    Ok(n) => err_text.decode(&err_buf[..n]),
                    Err(e) => {
                        tracing::warn!(process_id = %process.id(), error = %e, "Failed to read stderr");
                        stderr_open = false;
                        err_text.finish()
                    }
                };
                if !text.is_empty() {
                    process.ingest_stderr(&text)?;
                }
            }
        }
    }

    let status = child.wait().await?;
    let exit_code = exit_code(status);
    tracing::info!(process_id = %process.id(), exit_code, cancelled, "Process exited");

    process.close(exit_code)?;

    Ok(ProcessSummary {
        id: process.id().clone(),
        exit_code,
        state: process.state(),
        reports: process.reports_emitted(),
        invalid_reports: process.invalid_reports(),
        chunks: process.chunks().to_vec(),
        cancelled,
    })
}

async fn read_optional<R: AsyncRead + Unpin>(
    reader: &mut Option<R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match reader {
        Some(reader) => reader.read(buf).await,
        None => Ok(0),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNAL_EXIT_CODE)
}

/// Terminate gracefully: SIGTERM first, SIGKILL once `timeout` elapses.
/// Other platforms kill immediately.
async fn terminate(child: &mut Child, timeout: Duration) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = child.id() else {
            // Already exited.
            return Ok(());
        };

        let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
        let _ = kill(nix_pid, Signal::SIGTERM);

        let wait_result = tokio::time::timeout(timeout, child.wait()).await;

        match wait_result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => child.kill().await,
        }
    }

    #[cfg(not(unix))]
    {
        let _ = timeout;
        child.kill().await
    }
}

/// Incremental UTF-8 decoder that carries incomplete sequences between reads.
#[derive(Debug, Default)]
struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(text) => {
                    out.push_str(text);
                    self.carry.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.carry[..valid]).unwrap_or_default());
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.carry.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + len);
                        }
                    }
                }
            }
        }

        out
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        rest
    }
}
