//! One-shot asynchronous helper process execution
//!
//! A [`Job`] runs a single command line, captures its stdout and stderr line
//! by line into separate buffers, and fires a single completion event once
//! both streams have reached end-of-stream and the child has been reaped.
//! Reaping never happens while pipe data may still be unread.

pub mod argv;
mod wrapped_child;

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::{Result, SeatError};

pub use wrapped_child::WrappedChild;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl JobId {
    fn next() -> Self {
        Self(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobExit {
    /// Process exited normally with exit code
    Exited(i32),
    /// Process was terminated by a signal
    Signaled(i32),
}

impl JobExit {
    /// Decode a wait status
    pub fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Exited(code),
            (None, Some(sig)) => Self::Signaled(sig),
            (None, None) => Self::Exited(-1),
        }
    }

    /// Exit status as a shell would report it
    pub fn code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(sig) => 128 + sig,
        }
    }

    /// True only for a normal exit with status 0
    pub fn success(self) -> bool {
        self == Self::Exited(0)
    }
}

impl std::fmt::Display for JobExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Signaled(sig) => write!(f, "killed by signal {sig}"),
        }
    }
}

/// Completion event of a running job
///
/// Resolves exactly once. Resolves to `None` if the job was cancelled, in
/// which case no exit status is ever reported.
#[derive(Debug)]
pub struct JobCompletion {
    job_id: JobId,
    rx: oneshot::Receiver<JobExit>,
}

impl JobCompletion {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> Option<JobExit> {
        self.rx.await.ok()
    }
}

/// Watcher state of a started job
#[derive(Debug)]
struct RunningJob {
    pid: u32,
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
}

/// One-shot external process runner with captured output
#[derive(Debug)]
pub struct Job {
    id: JobId,
    command: Option<String>,
    stdout: Arc<Mutex<String>>,
    stderr: Arc<Mutex<String>>,
    running: Option<RunningJob>,
    started: bool,
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

impl Job {
    /// Create a job with no command
    pub fn new() -> Self {
        Self {
            id: JobId::next(),
            command: None,
            stdout: Arc::new(Mutex::new(String::new())),
            stderr: Arc::new(Mutex::new(String::new())),
            running: None,
            started: false,
        }
    }

    /// Create a job for `command`
    pub fn with_command(command: impl Into<String>) -> Self {
        let mut job = Self::new();
        job.set_command(command);
        job
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Set the command line to run
    ///
    /// Ignored once the job has been executed.
    pub fn set_command(&mut self, command: impl Into<String>) {
        if self.started {
            tracing::debug!(job_id = %self.id, "Ignoring command change on started job");
            return;
        }
        self.command = Some(command.into());
    }

    /// PID of the child while it is tracked
    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.pid)
    }

    /// Check if a child is still tracked by this job
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.watcher.is_finished())
    }

    /// Spawn the command and start capturing its output
    ///
    /// Must be called from within a Tokio runtime. Errors are reported here
    /// only; once running, the outcome is delivered through the returned
    /// completion event.
    pub fn execute(&mut self) -> Result<JobCompletion> {
        if self.started {
            return Err(SeatError::AlreadyStarted(self.id.0));
        }
        let command = self.command.clone().ok_or(SeatError::NoCommand)?;
        let argv = argv::split(&command)?;

        let mut child = WrappedChild::spawn(&argv).map_err(|e| SeatError::spawn(&command, e))?;
        let pid = child.id();
        let Some((stdout, stderr)) = child.take_output() else {
            drop(child.signal(libc::SIGKILL));
            tokio::spawn(async move { drop(child.wait().await) });
            return Err(SeatError::internal("helper output pipes missing"));
        };
        self.started = true;

        tracing::debug!(job_id = %self.id, pid, command = %command, "Job started");

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let watch = Watch {
            job_id: self.id,
            child,
            stdout_buf: Arc::clone(&self.stdout),
            stderr_buf: Arc::clone(&self.stderr),
            cancel: cancel.clone(),
        };
        let watcher = tokio::spawn(watch.run(stdout, stderr, tx));

        self.running = Some(RunningJob {
            pid,
            cancel,
            watcher,
        });

        Ok(JobCompletion { job_id: self.id, rx })
    }

    /// Captured stdout so far
    ///
    /// Only final once the completion event has fired.
    pub async fn stdout(&self) -> String {
        self.stdout.lock().await.clone()
    }

    /// Captured stderr so far
    pub async fn stderr(&self) -> String {
        self.stderr.lock().await.clone()
    }

    /// Terminate the child and wait until it has been reaped
    ///
    /// The completion event never fires after this returns. Returns false if
    /// no child is tracked (never started, or already completed).
    pub async fn cancel(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };
        if running.watcher.is_finished() {
            return false;
        }

        tracing::debug!(job_id = %self.id, pid = running.pid, "Cancelling job");
        running.cancel.cancel();
        if let Err(e) = running.watcher.await {
            tracing::warn!(job_id = %self.id, error = %e, "Job watcher ended abnormally");
        }
        true
    }
}

/// Output pump and reaper for one child
struct Watch {
    job_id: JobId,
    child: WrappedChild,
    stdout_buf: Arc<Mutex<String>>,
    stderr_buf: Arc<Mutex<String>>,
    cancel: CancellationToken,
}

impl Watch {
    async fn run<O, E>(mut self, stdout: O, stderr: E, done: oneshot::Sender<JobExit>)
    where
        O: AsyncRead + Unpin,
        E: AsyncRead + Unpin,
    {
        let mut out = Some(BufReader::new(stdout));
        let mut err = Some(BufReader::new(stderr));
        let mut out_line = Vec::new();
        let mut err_line = Vec::new();
        let cancel = self.cancel.clone();

        while out.is_some() || err.is_some() {
            tokio::select! {
                () = cancel.cancelled() => {
                    self.terminate().await;
                    return;
                }
                read = next_line(&mut out, &mut out_line) => {
                    if !self.take_line(read, &mut out_line, StreamKind::Stdout).await {
                        out = None;
                    }
                }
                read = next_line(&mut err, &mut err_line) => {
                    if !self.take_line(read, &mut err_line, StreamKind::Stderr).await {
                        err = None;
                    }
                }
            }
        }

        let status = tokio::select! {
            () = cancel.cancelled() => {
                self.terminate().await;
                return;
            }
            status = self.reap() => status,
        };

        let Some(status) = status else {
            return;
        };
        let exit = JobExit::from_status(status);
        tracing::debug!(job_id = %self.job_id, %exit, "Job completed");
        // The receiver is gone only if the owner dropped the job.
        drop(done.send(exit));
    }

    /// Append a finished line to its buffer
    ///
    /// Returns false when the stream has reached a terminal state.
    async fn take_line(
        &self,
        read: std::io::Result<usize>,
        line: &mut Vec<u8>,
        kind: StreamKind,
    ) -> bool {
        let open = match read {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(job_id = %self.job_id, stream = kind.name(), error = %e, "Read failed, closing stream");
                false
            }
        };

        if !line.is_empty() {
            let text = String::from_utf8_lossy(line);
            #[cfg(feature = "verbose-debug")]
            tracing::trace!(job_id = %self.job_id, stream = kind.name(), line = %text.trim_end(), "Captured line");
            let buf = match kind {
                StreamKind::Stdout => &self.stdout_buf,
                StreamKind::Stderr => &self.stderr_buf,
            };
            buf.lock().await.push_str(&text);
            line.clear();
        }

        if !open {
            tracing::trace!(job_id = %self.job_id, stream = kind.name(), "Stream closed");
        }
        open
    }

    /// Wait for the child, retrying interrupted waits
    ///
    /// Returns `None` if the child was already reaped elsewhere.
    async fn reap(&mut self) -> Option<ExitStatus> {
        loop {
            match self.child.wait().await {
                Ok(status) => return Some(status),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) if e.raw_os_error() == Some(libc::ECHILD) => return None,
                Err(e) => {
                    tracing::warn!(job_id = %self.job_id, error = %e, "Failed to reap helper");
                    return None;
                }
            }
        }
    }

    async fn terminate(&mut self) {
        let pid = self.child.id();
        if let Err(e) = self.child.signal(libc::SIGTERM) {
            if e.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!(job_id = %self.job_id, pid, error = %e, "Failed to signal helper");
            }
        }
        let status = self.reap().await;
        tracing::debug!(job_id = %self.job_id, pid, ?status, "Job cancelled");
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Read the next line of an open stream; pends forever once closed
async fn next_line<R>(reader: &mut Option<BufReader<R>>, line: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(reader) => reader.read_until(b'\n', line).await,
        None => std::future::pending().await,
    }
}
