//! Prediction router — dispatches models to the predicter for their type.

use std::sync::Arc;

use async_trait::async_trait;
use foresight_state::{Model, TimestampedReplicas};
use tracing::debug;

use crate::error::PredictError;
use crate::hook::HookExecutor;
use crate::holt_winters::HoltWintersPredicter;
use crate::linear::LinearPredicter;
use crate::runner::PredictionRunner;

/// Type name reported by the router itself.
pub const ROUTER_TYPE: &str = "Model";

/// A forecasting model over a replica history.
#[async_trait]
pub trait Predicter: Send + Sync {
    /// Forecast a replica count from the model's history.
    async fn get_prediction(
        &self,
        model: &Model,
        history: &[TimestampedReplicas],
    ) -> Result<i32, PredictError>;

    /// Drop the history entries the model no longer needs.
    fn prune_history(
        &self,
        model: &Model,
        history: Vec<TimestampedReplicas>,
    ) -> Result<Vec<TimestampedReplicas>, PredictError>;

    fn get_type(&self) -> &str;
}

/// Routes each model to the registered predicter for its type.
pub struct ModelPredict {
    predicters: Vec<Arc<dyn Predicter>>,
}

impl ModelPredict {
    pub fn new(predicters: Vec<Arc<dyn Predicter>>) -> Self {
        Self { predicters }
    }

    /// Linear and Holt-Winters predicters sharing one runner.
    pub fn with_defaults(
        runner: Arc<dyn PredictionRunner>,
        hooks: Arc<dyn HookExecutor>,
    ) -> Self {
        Self::new(vec![
            Arc::new(LinearPredicter::new(runner.clone())),
            Arc::new(HoltWintersPredicter::new(runner, hooks)),
        ])
    }

    fn predicter_for(&self, model: &Model) -> Result<&Arc<dyn Predicter>, PredictError> {
        let kind = model.kind.as_str();
        self.predicters
            .iter()
            .find(|p| p.get_type() == kind)
            .ok_or_else(|| PredictError::UnknownModelType(kind.to_string()))
    }
}

#[async_trait]
impl Predicter for ModelPredict {
    async fn get_prediction(
        &self,
        model: &Model,
        history: &[TimestampedReplicas],
    ) -> Result<i32, PredictError> {
        let predicter = self.predicter_for(model)?;
        debug!(model = %model.name, kind = %model.kind, points = history.len(), "routing prediction");
        predicter.get_prediction(model, history).await
    }

    fn prune_history(
        &self,
        model: &Model,
        history: Vec<TimestampedReplicas>,
    ) -> Result<Vec<TimestampedReplicas>, PredictError> {
        self.predicter_for(model)?.prune_history(model, history)
    }

    fn get_type(&self) -> &str {
        ROUTER_TYPE
    }
}
