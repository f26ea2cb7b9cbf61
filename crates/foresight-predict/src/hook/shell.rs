//! Shell tuning hook: runs a local program with the value on stdin.

use std::process::Stdio;

use async_trait::async_trait;
use foresight_state::HookDefinition;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{HookError, HookExecutor};

/// Executes `shell` hook definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellHookExecutor;

#[async_trait]
impl HookExecutor for ShellHookExecutor {
    async fn execute_with_value(
        &self,
        definition: &HookDefinition,
        value: &str,
    ) -> Result<String, HookError> {
        let shell = definition
            .shell
            .as_ref()
            .ok_or(HookError::MissingConfig("shell"))?;
        let timeout = definition.timeout();

        let mut child = Command::new(&shell.entrypoint)
            .args(&shell.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HookError::Exec(format!("spawn '{}': {e}", shell.entrypoint)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| HookError::Exec("stdin unavailable".to_string()))?;
        let input = value.as_bytes().to_vec();

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

        let output = match tokio::time::timeout(timeout, work).await {
            Ok(result) => result.map_err(|e| HookError::Exec(e.to_string()))?,
            Err(_) => {
                debug!(entrypoint = %shell.entrypoint, ?timeout, "shell hook killed after timeout");
                return Err(HookError::Timeout(timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HookError::Exec(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn hook_type(&self) -> &'static str {
        "shell"
    }
}
