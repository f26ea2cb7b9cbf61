//! Linear regression predicter.

use std::sync::Arc;

use async_trait::async_trait;
use foresight_state::{LinearConfig, Model, ModelType, TimestampedReplicas};
use serde::Serialize;

use crate::error::{PredictError, parse_prediction};
use crate::kernel;
use crate::router::Predicter;
use crate::runner::PredictionRunner;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinearParameters<'a> {
    look_ahead: i64,
    replica_history: &'a [TimestampedReplicas],
}

/// Fits a least-squares line over the history and evaluates it
/// `lookAhead` seconds into the future.
pub struct LinearPredicter {
    runner: Arc<dyn PredictionRunner>,
}

impl LinearPredicter {
    pub fn new(runner: Arc<dyn PredictionRunner>) -> Self {
        Self { runner }
    }
}

fn config(model: &Model) -> Result<&LinearConfig, PredictError> {
    model
        .linear
        .as_ref()
        .ok_or(PredictError::MissingConfig("Linear"))
}

#[async_trait]
impl Predicter for LinearPredicter {
    async fn get_prediction(
        &self,
        model: &Model,
        history: &[TimestampedReplicas],
    ) -> Result<i32, PredictError> {
        let linear = config(model)?;

        match history {
            [] => return Err(PredictError::NoEvaluations),
            [only] => return Ok(only.replicas),
            _ => {}
        }

        let input = serde_json::to_string(&LinearParameters {
            look_ahead: linear.look_ahead,
            replica_history: history,
        })
        .map_err(|e| PredictError::Encode(e.to_string()))?;

        let output = self
            .runner
            .run(kernel::LINEAR_REGRESSION, &input, model.calculation_timeout())
            .await?;
        parse_prediction(&output)
    }

    fn prune_history(
        &self,
        model: &Model,
        mut history: Vec<TimestampedReplicas>,
    ) -> Result<Vec<TimestampedReplicas>, PredictError> {
        let linear = config(model)?;
        if history.len() < linear.history_size {
            return Ok(history);
        }

        // Newest first, then drop the oldest beyond the configured size.
        history.sort_by(|a, b| b.time.cmp(&a.time));
        history.truncate(linear.history_size);
        Ok(history)
    }

    fn get_type(&self) -> &str {
        ModelType::Linear.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::runner::RunnerError;

    /// Records every invocation and answers with a fixed output.
    struct Recording {
        output: String,
        calls: Mutex<Vec<(String, String, Duration)>>,
    }

    impl Recording {
        fn new(output: &str) -> Arc<Self> {
            Arc::new(Self {
                output: output.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PredictionRunner for Recording {
        async fn run(
            &self,
            algorithm: &str,
            input: &str,
            timeout: Duration,
        ) -> Result<String, RunnerError> {
            self.calls
                .lock()
                .unwrap()
                .push((algorithm.to_string(), input.to_string(), timeout));
            Ok(self.output.clone())
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn model(history_size: usize) -> Model {
        Model {
            kind: ModelType::Linear,
            name: "linear".to_string(),
            per_sync_period: None,
            start_interval: None,
            reset_duration: None,
            calculation_timeout: Some(1500),
            linear: Some(LinearConfig {
                history_size,
                look_ahead: 10,
            }),
            holt_winters: None,
        }
    }

    #[tokio::test]
    async fn empty_history_fails() {
        let predicter = LinearPredicter::new(Recording::new("1"));
        let err = predicter.get_prediction(&model(3), &[]).await.unwrap_err();
        assert!(matches!(err, PredictError::NoEvaluations));
    }

    #[tokio::test]
    async fn single_point_short_circuits() {
        let runner = Recording::new("99");
        let predicter = LinearPredicter::new(runner.clone());
        let history = [TimestampedReplicas::new(at(0), 6)];
        assert_eq!(predicter.get_prediction(&model(3), &history).await.unwrap(), 6);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invokes_regression_kernel() {
        let runner = Recording::new("5\n");
        let predicter = LinearPredicter::new(runner.clone());
        let history = [
            TimestampedReplicas::new(at(0), 3),
            TimestampedReplicas::new(at(15), 4),
        ];

        assert_eq!(predicter.get_prediction(&model(3), &history).await.unwrap(), 5);

        let calls = runner.calls.lock().unwrap();
        let (algorithm, input, timeout) = &calls[0];
        assert_eq!(algorithm, kernel::LINEAR_REGRESSION);
        assert_eq!(*timeout, Duration::from_millis(1500));
        let parsed: serde_json::Value = serde_json::from_str(input).unwrap();
        assert_eq!(parsed["lookAhead"], 10);
        assert_eq!(parsed["replicaHistory"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn garbage_output_is_an_error() {
        let predicter = LinearPredicter::new(Recording::new("not-a-number"));
        let history = [
            TimestampedReplicas::new(at(0), 3),
            TimestampedReplicas::new(at(15), 4),
        ];
        let err = predicter.get_prediction(&model(3), &history).await.unwrap_err();
        assert!(matches!(err, PredictError::InvalidOutput { .. }));
    }

    #[tokio::test]
    async fn missing_config_fails() {
        let predicter = LinearPredicter::new(Recording::new("1"));
        let mut m = model(3);
        m.linear = None;
        let err = predicter.get_prediction(&m, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "no Linear configuration provided for model");
        assert!(predicter.prune_history(&m, Vec::new()).is_err());
    }

    #[test]
    fn prune_keeps_newest_history_size() {
        let predicter = LinearPredicter::new(Recording::new("1"));
        let history = vec![
            TimestampedReplicas::new(at(0), 1),
            TimestampedReplicas::new(at(30), 3),
            TimestampedReplicas::new(at(15), 2),
            TimestampedReplicas::new(at(45), 4),
        ];
        let pruned = predicter.prune_history(&model(2), history).unwrap();
        let replicas: Vec<i32> = pruned.iter().map(|p| p.replicas).collect();
        assert_eq!(replicas, vec![4, 3]);
    }

    #[test]
    fn prune_leaves_short_history_untouched() {
        let predicter = LinearPredicter::new(Recording::new("1"));
        let history = vec![
            TimestampedReplicas::new(at(0), 1),
            TimestampedReplicas::new(at(15), 2),
        ];
        let pruned = predicter.prune_history(&model(3), history.clone()).unwrap();
        assert_eq!(pruned, history);
    }
}
