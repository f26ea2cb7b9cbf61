//! Runtime tuning hooks.
//!
//! A hook is an outbound call that hands a serialized value to a user
//! endpoint (HTTP) or program (shell) and returns whatever it answers.

pub mod http;
pub mod shell;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use foresight_state::HookDefinition;
use thiserror::Error;

pub use http::HttpHookExecutor;
pub use shell::ShellHookExecutor;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("missing required '{0}' configuration on hook definition")]
    MissingConfig(&'static str),

    #[error("unknown hook type '{0}'")]
    UnknownType(String),

    #[error("hook timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid hook request: {0}")]
    InvalidRequest(String),

    #[error("http request failed, status: [{status}], response: '{body}'")]
    Status { status: u16, body: String },

    #[error("hook transport error: {0}")]
    Transport(String),

    #[error("hook execution failed: {0}")]
    Exec(String),
}

/// Executes a hook definition with a value and returns its raw response.
#[async_trait]
pub trait HookExecutor: Send + Sync {
    async fn execute_with_value(
        &self,
        definition: &HookDefinition,
        value: &str,
    ) -> Result<String, HookError>;

    /// The `type` of hook definition this executor handles.
    fn hook_type(&self) -> &'static str;
}

/// Dispatches a hook definition to the executor registered for its type.
pub struct CombinedHook {
    executors: HashMap<&'static str, Arc<dyn HookExecutor>>,
}

impl CombinedHook {
    pub fn new(executors: Vec<Arc<dyn HookExecutor>>) -> Self {
        let executors = executors
            .into_iter()
            .map(|executor| (executor.hook_type(), executor))
            .collect();
        Self { executors }
    }
}

impl Default for CombinedHook {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(HttpHookExecutor),
            Arc::new(ShellHookExecutor),
        ])
    }
}

#[async_trait]
impl HookExecutor for CombinedHook {
    async fn execute_with_value(
        &self,
        definition: &HookDefinition,
        value: &str,
    ) -> Result<String, HookError> {
        let kind = definition.kind.as_str();
        let executor = self
            .executors
            .get(kind)
            .ok_or_else(|| HookError::UnknownType(kind.to_string()))?;
        executor.execute_with_value(definition, value).await
    }

    fn hook_type(&self) -> &'static str {
        "combined"
    }
}
