//! Child processes with both output pipes drained line by line.
//!
//! Leaving a pipe unread lets a chatty child fill the OS buffer and block
//! forever, so stdout and stderr are always consumed concurrently with the
//! wait, and every line is echoed through `tracing`.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::error::PipelineError;

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default, Clone)]
pub struct DrainStats {
    pub lines: usize,
    pub non_empty: usize,
    /// Last few non-empty lines, oldest first.
    pub tail: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DrainedOutput {
    pub status: ExitStatus,
    pub stdout: DrainStats,
    pub stderr: DrainStats,
}

impl DrainedOutput {
    /// Whether the child wrote anything non-blank to stderr.
    pub fn saw_stderr(&self) -> bool {
        self.stderr.non_empty > 0
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: R, label: &str, stream: Stream) -> std::io::Result<DrainStats> {
    let mut reader = BufReader::new(reader);
    let mut stats = DrainStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        stats.lines += 1;
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        stats.non_empty += 1;
        match stream {
            Stream::Stdout => tracing::info!("[{label}] {line}"),
            Stream::Stderr => {
                tracing::warn!("[{label}] {line}");
                if stats.tail.len() == STDERR_TAIL {
                    stats.tail.remove(0);
                }
                stats.tail.push(line.to_string());
            }
        }
    }
    Ok(stats)
}

/// Run `program args...` to completion, draining its output.
///
/// With a `timeout`, an overrunning child is killed and `Ok(None)` is returned.
pub async fn run_drained<I, S>(
    program: &Path,
    args: I,
    cwd: Option<&Path>,
    timeout: Option<Duration>,
    label: &str,
) -> Result<Option<DrainedOutput>, PipelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let spawn_err = |source| PipelineError::Spawn {
        program: program.to_path_buf(),
        source,
    };
    let mut child = command.spawn().map_err(spawn_err)?;
    let missing_pipe = || spawn_err(std::io::Error::other("child pipe not captured"));
    let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
    let stderr = child.stderr.take().ok_or_else(missing_pipe)?;

    let io_err = |source| PipelineError::io(program, source);
    let finished = {
        let work = async {
            tokio::join!(
                drain(stdout, label, Stream::Stdout),
                drain(stderr, label, Stream::Stderr),
                child.wait()
            )
        };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.ok(),
            None => Some(work.await),
        }
    };

    let Some((out, err, status)) = finished else {
        tracing::warn!("[{label}] timed out; killing child");
        child.kill().await.map_err(io_err)?;
        return Ok(None);
    };

    Ok(Some(DrainedOutput {
        status: status.map_err(io_err)?,
        stdout: out.map_err(io_err)?,
        stderr: err.map_err(io_err)?,
    }))
}
