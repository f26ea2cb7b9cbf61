//! foresight-predict — replica forecasting for predictive autoscalers.
//!
//! Predicters turn a model's stored replica history into a forecast by
//! handing a JSON parameter blob to a [`PredictionRunner`]. The runner
//! either spawns a worker process or evaluates the built-in [`kernel`]s
//! in-process. Holt-Winters models may fetch their smoothing values at
//! runtime through a [`hook`].

pub mod error;
pub mod holt_winters;
pub mod hook;
pub mod kernel;
pub mod linear;
pub mod router;
pub mod runner;

pub use error::PredictError;
pub use holt_winters::HoltWintersPredicter;
pub use hook::{CombinedHook, HookError, HookExecutor};
pub use linear::LinearPredicter;
pub use router::{ModelPredict, Predicter};
pub use runner::{NativeRunner, PredictionRunner, ProcessRunner, RunnerError};
