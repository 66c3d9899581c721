//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill on all platforms.

use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::application::ports::{CommandRunner, OutputLine};
use crate::domain::error::ProcessError;

/// Default timeout for short CLI calls (cloud API calls, `output -json`).
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(60);

/// Reads one `\n`-terminated line as raw bytes and decodes it lossily.
/// A line that is not UTF-8 is still relayed, so the pipe keeps draining.
async fn next_raw_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

async fn read_all<R: AsyncRead + Unpin>(handle: Option<&mut R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        h.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Production `CommandRunner`: uses tokio for async process execution
/// with guaranteed timeout and kill on all platforms.
///
/// On Windows, `tokio::time::timeout` around `.output().await` does NOT kill
/// the child process when the timeout fires; the future is dropped but the
/// OS process keeps running. This implementation uses `tokio::select!` with
/// explicit `child.kill()` to guarantee the process is terminated.
///
/// Streaming runs have no timeout; an apply can legitimately take an hour.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn spawn(program: &str, mut cmd: Command) -> Result<tokio::process::Child> {
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                ProcessError::Spawn {
                    program: program.to_string(),
                    source,
                }
                .into()
            })
    }

    async fn collect(&self, program: &str, cmd: Command) -> Result<Output> {
        let mut child = Self::spawn(program, cmd)?;
        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    read_all(stdout_handle.as_mut()),
                    read_all(stderr_handle.as_mut()),
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout: stdout.with_context(|| format!("reading stdout of {program}"))?,
                    stderr: stderr.with_context(|| format!("reading stderr of {program}"))?,
                })
            } => result,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                Err(ProcessError::TimedOut {
                    program: program.to_string(),
                    secs: self.timeout.as_secs(),
                }
                .into())
            }
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args).envs(env.iter().copied());
        debug!(program, ?args, "running command");
        self.collect(program, cmd).await
    }

    async fn run_in(&self, program: &str, args: &[String], dir: &Path) -> Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        debug!(program, ?args, dir = %dir.display(), "running command");
        self.collect(program, cmd).await
    }

    async fn stream_in(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        on_line: &mut dyn FnMut(OutputLine),
    ) -> Result<ExitStatus> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        debug!(program, ?args, dir = %dir.display(), "streaming command");
        let mut child = Self::spawn(program, cmd)?;

        let mut stdout_reader = child.stdout.take().map(BufReader::new);
        let mut stderr_reader = child.stderr.take().map(BufReader::new);
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        // A reader is dropped once it hits EOF or an I/O error; dropping closes
        // the pipe so the child can never block writing into it.
        while stdout_reader.is_some() || stderr_reader.is_some() {
            tokio::select! {
                line = async {
                    match stdout_reader.as_mut() {
                        Some(reader) => next_raw_line(reader, &mut stdout_buf).await,
                        None => std::future::pending().await,
                    }
                }, if stdout_reader.is_some() => match line {
                    Ok(Some(line)) => on_line(OutputLine::Stdout(line)),
                    Ok(None) => stdout_reader = None,
                    Err(e) => {
                        warn!(program, error = %e, "error reading stdout");
                        stdout_reader = None;
                    }
                },
                line = async {
                    match stderr_reader.as_mut() {
                        Some(reader) => next_raw_line(reader, &mut stderr_buf).await,
                        None => std::future::pending().await,
                    }
                }, if stderr_reader.is_some() => match line {
                    Ok(Some(line)) => on_line(OutputLine::Stderr(line)),
                    Ok(None) => stderr_reader = None,
                    Err(e) => {
                        warn!(program, error = %e, "error reading stderr");
                        stderr_reader = None;
                    }
                },
            }
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))?;
        debug!(program, ?status, "command exited");
        Ok(status)
    }
}
