//! Error types for prediction models.

use thiserror::Error;

use crate::hook::HookError;
use crate::runner::RunnerError;

/// Errors produced while forecasting or pruning a model's history.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no {0} configuration provided for model")]
    MissingConfig(&'static str),

    #[error("no evaluations provided for Linear regression model")]
    NoEvaluations,

    #[error("no {0} tuning value provided for Holt-Winters prediction")]
    MissingTuning(&'static str),

    #[error("unknown model type '{0}'")]
    UnknownModelType(String),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("runtime tuning fetch hook failed: {0}")]
    Hook(#[from] HookError),

    #[error("invalid runtime tuning response: {0}")]
    TuningResponse(String),

    #[error("failed to encode algorithm input: {0}")]
    Encode(String),

    #[error("invalid algorithm output '{output}': {reason}")]
    InvalidOutput { output: String, reason: String },
}

/// Parse the integer a prediction kernel prints.
pub(crate) fn parse_prediction(output: &str) -> Result<i32, PredictError> {
    output
        .trim()
        .parse::<i32>()
        .map_err(|e| PredictError::InvalidOutput {
            output: output.to_string(),
            reason: e.to_string(),
        })
}
