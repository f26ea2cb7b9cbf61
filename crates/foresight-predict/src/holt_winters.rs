//! Holt-Winters predicter.
//!
//! Smoothing parameters come from the model, optionally overridden per
//! call by a runtime tuning hook. Until enough history exists for the
//! kernel to initialize, the forecast is `0` ("no forecast yet").

use std::sync::Arc;

use async_trait::async_trait;
use foresight_state::{HoltWintersConfig, Model, ModelType, TimestampedReplicas};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PredictError, parse_prediction};
use crate::hook::HookExecutor;
use crate::kernel::{self, holt_winters};
use crate::router::Predicter;
use crate::runner::PredictionRunner;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TuningRequest<'a> {
    model: &'a Model,
    replica_history: &'a [TimestampedReplicas],
}

#[derive(Debug, Default, Deserialize)]
struct TuningResponse {
    alpha: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
}

pub struct HoltWintersPredicter {
    runner: Arc<dyn PredictionRunner>,
    hooks: Arc<dyn HookExecutor>,
}

impl HoltWintersPredicter {
    pub fn new(runner: Arc<dyn PredictionRunner>, hooks: Arc<dyn HookExecutor>) -> Self {
        Self { runner, hooks }
    }

    async fn fetch_tuning(
        &self,
        model: &Model,
        config: &HoltWintersConfig,
        history: &[TimestampedReplicas],
    ) -> Result<TuningResponse, PredictError> {
        let Some(hook) = &config.runtime_tuning_fetch_hook else {
            return Ok(TuningResponse::default());
        };

        let request = serde_json::to_string(&TuningRequest {
            model,
            replica_history: history,
        })
        .map_err(|e| PredictError::Encode(e.to_string()))?;

        let response = self.hooks.execute_with_value(hook, &request).await?;
        let tuning: TuningResponse = serde_json::from_str(&response)
            .map_err(|e| PredictError::TuningResponse(e.to_string()))?;
        debug!(model = %model.name, ?tuning, "fetched runtime tuning values");
        Ok(tuning)
    }
}

fn config(model: &Model) -> Result<&HoltWintersConfig, PredictError> {
    model
        .holt_winters
        .as_ref()
        .ok_or(PredictError::MissingConfig("HoltWinters"))
}

/// History points needed before a forecast is attempted.
pub fn required_history(seasonal_periods: usize) -> usize {
    (2 * seasonal_periods).max(holt_winters::minimum_observations(seasonal_periods))
}

#[async_trait]
impl Predicter for HoltWintersPredicter {
    async fn get_prediction(
        &self,
        model: &Model,
        history: &[TimestampedReplicas],
    ) -> Result<i32, PredictError> {
        let hw = config(model)?;

        if history.len() < required_history(hw.seasonal_periods) {
            debug!(
                model = %model.name,
                points = history.len(),
                required = required_history(hw.seasonal_periods),
                "not enough history for Holt-Winters yet"
            );
            return Ok(0);
        }

        let tuning = self.fetch_tuning(model, hw, history).await?;
        let alpha = tuning
            .alpha
            .or(hw.alpha)
            .ok_or(PredictError::MissingTuning("alpha"))?;
        let beta = tuning
            .beta
            .or(hw.beta)
            .ok_or(PredictError::MissingTuning("beta"))?;
        let gamma = tuning
            .gamma
            .or(hw.gamma)
            .ok_or(PredictError::MissingTuning("gamma"))?;

        // Stored history may be newest first; the series runs oldest to newest.
        let mut ordered = history.to_vec();
        ordered.sort_by(|a, b| a.time.cmp(&b.time));
        let series = ordered.iter().map(|p| f64::from(p.replicas)).collect();

        let params = holt_winters::Parameters {
            series,
            alpha,
            beta,
            gamma,
            trend: hw.trend,
            seasonal: hw.seasonal,
            seasonal_periods: hw.seasonal_periods,
            damped_trend: hw.damped_trend,
            initialization_method: hw.initialization_method,
            initial_level: hw.initial_level,
            initial_trend: hw.initial_trend,
            initial_seasonal: hw.initial_seasonal,
        };
        let input =
            serde_json::to_string(&params).map_err(|e| PredictError::Encode(e.to_string()))?;

        let output = self
            .runner
            .run(kernel::HOLT_WINTERS, &input, model.calculation_timeout())
            .await?;
        parse_prediction(&output)
    }

    fn prune_history(
        &self,
        model: &Model,
        mut history: Vec<TimestampedReplicas>,
    ) -> Result<Vec<TimestampedReplicas>, PredictError> {
        let hw = config(model)?;
        let period = hw.seasonal_periods;
        if period == 0 {
            return Ok(history);
        }

        let seasons = history.len() / period;
        if seasons <= hw.stored_seasons {
            return Ok(history);
        }

        // Only whole seasons are dropped, oldest first.
        let remove = (seasons - hw.stored_seasons) * period;
        history.sort_by(|a, b| b.time.cmp(&a.time));
        history.truncate(history.len() - remove);
        Ok(history)
    }

    fn get_type(&self) -> &str {
        ModelType::HoltWinters.as_str()
    }
}
