//! Helper process spawned as its own process group
//!
//! Wraps process-wrap's ChildWrapper so a job can signal the helper together
//! with anything it forked, and reap it exactly once.

use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use process_wrap::tokio::{ChildWrapper, CommandWrap, ProcessGroup};
use tokio::process::{ChildStderr, ChildStdout};

/// Helper child process owned by a running job
#[derive(Debug)]
pub struct WrappedChild {
    inner: Box<dyn ChildWrapper>,
}

impl WrappedChild {
    /// Spawn `argv` with stdout and stderr piped and stdin closed
    ///
    /// The environment is inherited. The child leads a new process group.
    pub fn spawn(argv: &[String]) -> io::Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"))?;

        let inner = CommandWrap::with_new(program, |command| {
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        })
        .wrap(ProcessGroup::leader())
        .spawn()?;

        Ok(Self { inner })
    }

    /// Take ownership of both output pipes
    ///
    /// Returns `None` if either pipe was already taken.
    pub fn take_output(&mut self) -> Option<(ChildStdout, ChildStderr)> {
        let stdout = self.inner.stdout().take()?;
        let stderr = self.inner.stderr().take()?;
        Some((stdout, stderr))
    }

    /// Send a signal to the whole process group
    pub fn signal(&self, sig: i32) -> io::Result<()> {
        self.inner.signal(sig)
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        Pin::from(self.inner.wait()).await
    }

    /// Get the process ID (0 once reaped)
    pub fn id(&self) -> u32 {
        self.inner.id().unwrap_or(0)
    }
}
