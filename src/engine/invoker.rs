//! External tool invocation
//!
//! Runs one command with a wall-clock budget and turns whatever happened
//! (exit status, missing binary, timeout) into a `StageOutcome`. Nothing here
//! returns an error: every environmental failure is data.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use sumo_batch::engine::{ProcessInvoker, ToolInvoker};
//!
//! # async fn demo() {
//! let invoker = ProcessInvoker::new(200);
//! let outcome = invoker
//!     .invoke("netconvert", &["--version".to_string()], Duration::from_secs(5))
//!     .await;
//! println!("netconvert available: {}", outcome.succeeded);
//! # }
//! ```

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::result::{StageOutcome, EXIT_NO_STATUS};

/// How long a killed tool's output may take to drain
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Runs external commands on behalf of pipeline stages
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, command: &str, args: &[String], timeout: Duration) -> StageOutcome;
}

/// Invoker backed by real child processes
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    diagnostic_limit: usize,
}

impl ProcessInvoker {
    /// `diagnostic_limit` is the number of trailing characters kept from
    /// each output stream
    pub fn new(diagnostic_limit: usize) -> Self {
        Self { diagnostic_limit }
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new(200)
    }
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, command: &str, args: &[String], timeout: Duration) -> StageOutcome {
        info!("Executing {} ({} args, timeout {:?})", command, args.len(), timeout);
        debug!("Arguments: {:?}", args);

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Executable not found: {}", command);
                return StageOutcome::tool_not_found(command);
            }
            Err(e) => {
                warn!("Failed to start {}: {}", command, e);
                return StageOutcome::not_started(format!("failed to start {}: {}", command, e));
            }
        };

        // Drain both pipes while waiting so a chatty tool cannot block on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout_tail = tail(&collect(stdout).await, self.diagnostic_limit);
                let stderr_tail = tail(&collect(stderr).await, self.diagnostic_limit);
                let exit_code = status.code().unwrap_or(EXIT_NO_STATUS);

                if status.success() {
                    info!("{} completed successfully", command);
                } else {
                    warn!("{} exited with code {}", command, exit_code);
                }

                StageOutcome {
                    succeeded: status.success(),
                    exit_code,
                    stdout_tail,
                    stderr_tail,
                    timed_out: false,
                    output_artifact: None,
                }
            }
            Ok(Err(e)) => {
                warn!("Failed waiting for {}: {}", command, e);
                stdout.abort();
                stderr.abort();
                StageOutcome::not_started(format!("failed waiting for {}: {}", command, e))
            }
            Err(_) => {
                warn!("{} timed out after {:?}, killing it", command, timeout);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", command, e);
                }
                // Grandchildren may still hold the pipes open, so only wait briefly
                let stdout_tail = tail(
                    &collect_within(stdout, DRAIN_GRACE).await,
                    self.diagnostic_limit,
                );
                let stderr_tail = tail(
                    &collect_within(stderr, DRAIN_GRACE).await,
                    self.diagnostic_limit,
                );
                StageOutcome::timed_out(timeout.as_secs_f64(), stdout_tail, stderr_tail)
            }
        }
    }
}

fn drain<R>(reader: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buf).await;
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

async fn collect(handle: JoinHandle<String>) -> String {
    handle.await.unwrap_or_default()
}

/// Like `collect`, but gives up after `grace` and drops what was read
async fn collect_within(mut handle: JoinHandle<String>, grace: Duration) -> String {
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}

/// Last `limit` characters of `text`, trimmed
pub fn tail(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= limit {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(count - limit).collect()
    }
}

/// Resolve an executable the way the invoker would find it
pub fn locate_tool(command: &str) -> Option<PathBuf> {
    which::which(command).ok()
}
