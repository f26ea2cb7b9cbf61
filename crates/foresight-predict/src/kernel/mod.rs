//! Native numeric kernels.
//!
//! Each kernel reads a JSON parameter blob and yields a single integer
//! forecast. The process runner reaches them through the daemon's
//! `kernel` subcommand; the native runner calls them directly.

pub mod holt_winters;
pub mod linear_regression;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Algorithm id of the linear regression kernel.
pub const LINEAR_REGRESSION: &str = "algorithms/linear_regression";

/// Algorithm id of the Holt-Winters kernel.
pub const HOLT_WINTERS: &str = "algorithms/holt_winters";

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("no standard input provided to {0}")]
    EmptyInput(String),

    #[error("invalid JSON provided: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid data provided: {0}")]
    InvalidData(String),

    #[error("forecast is not a finite number")]
    NonFinite,
}

/// Run the named kernel against a JSON input, evaluating at the current time.
pub fn run_algorithm(algorithm: &str, input: &str) -> Result<String, KernelError> {
    run_algorithm_at(algorithm, input, Utc::now())
}

/// Run the named kernel against a JSON input, evaluating at `now`.
pub fn run_algorithm_at(
    algorithm: &str,
    input: &str,
    now: DateTime<Utc>,
) -> Result<String, KernelError> {
    if input.trim().is_empty() {
        return Err(KernelError::EmptyInput(algorithm.to_string()));
    }

    let prediction = match algorithm {
        LINEAR_REGRESSION => {
            let params: linear_regression::Parameters = serde_json::from_str(input)?;
            linear_regression::predict(&params, now)?
        }
        HOLT_WINTERS => {
            let params: holt_winters::Parameters = serde_json::from_str(input)?;
            holt_winters::forecast(&params)?
        }
        other => return Err(KernelError::UnknownAlgorithm(other.to_string())),
    };
    Ok(prediction.to_string())
}

/// Round a forecast up to a whole replica count, saturating at the i32 range.
pub(crate) fn ceil_to_replicas(value: f64) -> Result<i32, KernelError> {
    if !value.is_finite() {
        return Err(KernelError::NonFinite);
    }
    Ok(value.ceil() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_algorithm_id() {
        let input = r#"{"lookAhead": 10, "replicaHistory": [
            {"time": "2024-01-01T00:00:00Z", "replicas": 2},
            {"time": "2024-01-01T00:01:00Z", "replicas": 2}
        ]}"#;
        let now = "2024-01-01T00:01:00Z".parse().unwrap();
        assert_eq!(run_algorithm_at(LINEAR_REGRESSION, input, now).unwrap(), "2");
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = run_algorithm("algorithms/sarima", "{}").unwrap_err();
        assert!(matches!(err, KernelError::UnknownAlgorithm(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = run_algorithm(HOLT_WINTERS, "  ").unwrap_err();
        assert!(matches!(err, KernelError::EmptyInput(_)));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let err = run_algorithm(HOLT_WINTERS, "{\"series\": [1, 2").unwrap_err();
        assert!(matches!(err, KernelError::InvalidJson(_)));
    }

    #[test]
    fn ceil_saturates() {
        assert_eq!(ceil_to_replicas(2.1).unwrap(), 3);
        assert_eq!(ceil_to_replicas(-0.5).unwrap(), 0);
        assert_eq!(ceil_to_replicas(1e12).unwrap(), i32::MAX);
        assert!(ceil_to_replicas(f64::NAN).is_err());
    }
}
