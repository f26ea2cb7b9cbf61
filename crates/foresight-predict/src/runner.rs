//! Prediction runners — execute a numeric kernel under a time budget.
//!
//! [`ProcessRunner`] spawns a worker process per call, writes the JSON
//! parameters to its stdin and kills it when the budget runs out.
//! [`NativeRunner`] runs the in-process kernels on the blocking pool.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::kernel;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("algorithm '{algorithm}' timed out after {timeout:?}")]
    Timeout { algorithm: String, timeout: Duration },

    #[error("algorithm '{algorithm}' failed: {message}")]
    Exec { algorithm: String, message: String },
}

impl RunnerError {
    fn exec(algorithm: &str, message: impl ToString) -> Self {
        RunnerError::Exec {
            algorithm: algorithm.to_string(),
            message: message.to_string(),
        }
    }
}

/// Runs a prediction kernel with a parameter blob and returns its output.
#[async_trait]
pub trait PredictionRunner: Send + Sync {
    async fn run(
        &self,
        algorithm: &str,
        input: &str,
        timeout: Duration,
    ) -> Result<String, RunnerError>;
}

/// Runs each kernel invocation in a child process.
///
/// The child is started as `program [args...] <algorithm>`, receives the
/// input on stdin and must print its result on stdout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-invoke the running executable's `kernel` subcommand.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, vec!["kernel".to_string()]))
    }
}

#[async_trait]
impl PredictionRunner for ProcessRunner {
    async fn run(
        &self,
        algorithm: &str,
        input: &str,
        timeout: Duration,
    ) -> Result<String, RunnerError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(algorithm)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::exec(algorithm, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RunnerError::exec(algorithm, "stdin unavailable"))?;
        let input = input.as_bytes().to_vec();

        let work = async move {
            // A worker may exit without draining its input.
            if let Err(e) = stdin.write_all(&input).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(e);
            }
            drop(stdin);
            child.wait_with_output().await
        };

        // On timeout the future (and the child it owns) is dropped, which
        // kills the process.
        let output = match tokio::time::timeout(timeout, work).await {
            Ok(result) => result.map_err(|e| RunnerError::exec(algorithm, e))?,
            Err(_) => {
                debug!(algorithm, ?timeout, "algorithm process killed after timeout");
                return Err(RunnerError::Timeout {
                    algorithm: algorithm.to_string(),
                    timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunnerError::exec(
                algorithm,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs the built-in kernels in-process on the blocking thread pool.
///
/// A timed-out computation is abandoned rather than killed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

#[async_trait]
impl PredictionRunner for NativeRunner {
    async fn run(
        &self,
        algorithm: &str,
        input: &str,
        timeout: Duration,
    ) -> Result<String, RunnerError> {
        let id = algorithm.to_string();
        let input = input.to_string();
        let task = tokio::task::spawn_blocking(move || kernel::run_algorithm(&id, &input));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result.map_err(|e| RunnerError::exec(algorithm, e)),
            Ok(Err(join)) => Err(RunnerError::exec(algorithm, join)),
            Err(_) => Err(RunnerError::Timeout {
                algorithm: algorithm.to_string(),
                timeout,
            }),
        }
    }
}
