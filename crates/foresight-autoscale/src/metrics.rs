//! Metric evaluation — the replica count a stock autoscaler would pick.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foresight_state::{
    MetricSourceType, MetricSpec, MetricStatus, MetricTargetType, StateError, StateStore,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("no metrics provided")]
    NoMetrics,

    #[error("no readings recorded for selector '{selector}' in namespace '{namespace}'")]
    NoReadings { namespace: String, selector: String },

    #[error("no reading for metric '{0}'")]
    MissingReading(String),

    #[error("reading for metric '{name}' is stale ({age_secs}s old, limit {limit_secs}s)")]
    StaleReading {
        name: String,
        age_secs: i64,
        limit_secs: u64,
    },

    #[error("metric '{0}' has a non-positive target")]
    InvalidTarget(String),

    #[error(transparent)]
    State(#[from] StateError),
}

/// A metric spec paired with its measured value.
#[derive(Debug, Clone, PartialEq)]
pub struct GatheredMetric {
    pub spec: MetricSpec,
    pub current: f64,
    pub ready_pods: Option<i32>,
}

impl GatheredMetric {
    pub fn status(&self) -> MetricStatus {
        MetricStatus {
            name: self.spec.name.clone(),
            current: self.current,
        }
    }
}

/// Gathers metric values and turns them into a current-demand replica count.
#[async_trait]
pub trait MetricEvaluator: Send + Sync {
    async fn gather(
        &self,
        specs: &[MetricSpec],
        namespace: &str,
        selector: &str,
        cpu_initialization_period: Duration,
        initial_readiness_delay: Duration,
    ) -> Result<Vec<GatheredMetric>, MetricsError>;

    fn evaluate(
        &self,
        metrics: &[GatheredMetric],
        current_replicas: i32,
        tolerance: f64,
    ) -> Result<i32, MetricsError>;
}

/// Evaluates metrics against readings pushed into the state store.
#[derive(Clone)]
pub struct ReadingsEvaluator {
    state: StateStore,
}

impl ReadingsEvaluator {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    /// Gather as of `now`.
    pub fn gather_at(
        &self,
        specs: &[MetricSpec],
        namespace: &str,
        selector: &str,
        cpu_initialization_period: Duration,
        initial_readiness_delay: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<GatheredMetric>, MetricsError> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let readings = self
            .state
            .get_metric_readings(namespace, selector)?
            .ok_or_else(|| MetricsError::NoReadings {
                namespace: namespace.to_string(),
                selector: selector.to_string(),
            })?;

        specs
            .iter()
            .map(|spec| {
                let reading = readings
                    .readings
                    .iter()
                    .find(|r| r.name == spec.name)
                    .ok_or_else(|| MetricsError::MissingReading(spec.name.clone()))?;

                let limit = match spec.source {
                    MetricSourceType::Resource => cpu_initialization_period,
                    _ => initial_readiness_delay,
                };
                let age = now - reading.timestamp;
                if age.num_milliseconds() > limit.as_millis() as i64 {
                    return Err(MetricsError::StaleReading {
                        name: spec.name.clone(),
                        age_secs: age.num_seconds(),
                        limit_secs: limit.as_secs(),
                    });
                }

                Ok(GatheredMetric {
                    spec: spec.clone(),
                    current: reading.value,
                    ready_pods: reading.ready_pods,
                })
            })
            .collect()
    }
}

#[async_trait]
impl MetricEvaluator for ReadingsEvaluator {
    async fn gather(
        &self,
        specs: &[MetricSpec],
        namespace: &str,
        selector: &str,
        cpu_initialization_period: Duration,
        initial_readiness_delay: Duration,
    ) -> Result<Vec<GatheredMetric>, MetricsError> {
        self.gather_at(
            specs,
            namespace,
            selector,
            cpu_initialization_period,
            initial_readiness_delay,
            Utc::now(),
        )
    }

    fn evaluate(
        &self,
        metrics: &[GatheredMetric],
        current_replicas: i32,
        tolerance: f64,
    ) -> Result<i32, MetricsError> {
        evaluate_metrics(metrics, current_replicas, tolerance)
    }
}

/// Replica count proposed by each metric, maximized across metrics.
pub fn evaluate_metrics(
    metrics: &[GatheredMetric],
    current_replicas: i32,
    tolerance: f64,
) -> Result<i32, MetricsError> {
    let mut proposed: Option<i32> = None;

    for metric in metrics {
        let target = metric.spec.target.value;
        if target <= 0.0 {
            return Err(MetricsError::InvalidTarget(metric.spec.name.clone()));
        }

        let ratio = metric.current / target;
        let replicas = if (ratio - 1.0).abs() <= tolerance {
            current_replicas
        } else {
            let base = match metric.spec.target.kind {
                MetricTargetType::Utilization | MetricTargetType::AverageValue => {
                    metric.ready_pods.unwrap_or(current_replicas)
                }
                MetricTargetType::Value => current_replicas,
            };
            (ratio * f64::from(base)).ceil() as i32
        };

        debug!(
            metric = %metric.spec.name,
            current = metric.current,
            target,
            replicas,
            "metric evaluated"
        );
        proposed = Some(proposed.map_or(replicas, |p| p.max(replicas)));
    }

    proposed.ok_or(MetricsError::NoMetrics)
}
