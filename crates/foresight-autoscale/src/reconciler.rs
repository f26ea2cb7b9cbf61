//! Reconciler — one predictive scaling tick for one autoscaler.
//!
//! Each tick rereads the autoscaler, its state document and the target's
//! scale subresource, feeds the current demand to every model, reduces
//! the forecasts with the decision strategy, applies the scaling behavior
//! and writes the result back. Nothing is cached between ticks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use foresight_predict::Predicter;
use foresight_state::{
    AutoscalerSpec, ModelHistory, ObjectKey, PredictiveAutoscalerData, StateDocument,
    TimestampedReplicas,
};
use tracing::{debug, info, warn};

use crate::behavior::{self, Behavior, Histories};
use crate::cluster::ClusterClient;
use crate::error::ReconcileError;
use crate::metrics::MetricEvaluator;
use crate::{strategy, validate};

/// Delay before a failed tick is retried.
pub const DEFAULT_ERROR_RETRY: Duration = Duration::from_secs(10);

/// What the controller should do with a key after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Run again after the given delay.
    Requeue(Duration),
    /// Wait for the next change to the autoscaler or its state document.
    AwaitChange,
    /// The autoscaler is gone.
    Done,
}

pub struct Reconciler {
    cluster: Arc<dyn ClusterClient>,
    metrics: Arc<dyn MetricEvaluator>,
    predicter: Arc<dyn Predicter>,
    error_retry: Duration,
}

impl Reconciler {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        metrics: Arc<dyn MetricEvaluator>,
        predicter: Arc<dyn Predicter>,
    ) -> Self {
        Self {
            cluster,
            metrics,
            predicter,
            error_retry: DEFAULT_ERROR_RETRY,
        }
    }

    pub fn with_error_retry(mut self, error_retry: Duration) -> Self {
        self.error_retry = error_retry;
        self
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterClient> {
        &self.cluster
    }

    /// Reconcile the autoscaler at the current time.
    pub async fn reconcile(&self, key: &ObjectKey) -> ReconcileAction {
        self.reconcile_at(key, Utc::now()).await
    }

    /// Reconcile the autoscaler as of `now`.
    pub async fn reconcile_at(&self, key: &ObjectKey, now: DateTime<Utc>) -> ReconcileAction {
        match self.try_reconcile(key, now).await {
            Ok(action) => action,
            Err(e) => {
                warn!(autoscaler = %key, error = %e, retry = ?self.error_retry, "reconcile failed");
                ReconcileAction::Requeue(self.error_retry)
            }
        }
    }

    async fn try_reconcile(
        &self,
        key: &ObjectKey,
        now: DateTime<Utc>,
    ) -> Result<ReconcileAction, ReconcileError> {
        let Some(mut autoscaler) = self
            .cluster
            .get_autoscaler(key)
            .await
            .map_err(ReconcileError::Load)?
        else {
            debug!(autoscaler = %key, "autoscaler not found, dropping");
            return Ok(ReconcileAction::Done);
        };

        if let Err(e) = validate::validate(&autoscaler) {
            warn!(autoscaler = %key, error = %e, "invalid autoscaler, disabled until changed");
            return Ok(ReconcileAction::AwaitChange);
        }

        let spec = autoscaler.spec.clone();
        let target = &spec.scale_target_ref;

        let reference = target.to_string();
        if autoscaler.status.reference != reference {
            autoscaler.status.reference = reference;
            self.cluster
                .update_autoscaler_status(key, &autoscaler.status)
                .await
                .map_err(ReconcileError::Status)?;
        }

        let Some(mut doc) = self
            .cluster
            .get_state_document(key)
            .await
            .map_err(ReconcileError::StateDocument)?
        else {
            let doc =
                StateDocument::for_autoscaler(&autoscaler).map_err(ReconcileError::StateData)?;
            self.cluster
                .create_state_document(&doc)
                .await
                .map_err(ReconcileError::CreateStateDocument)?;
            debug!(autoscaler = %key, document = %doc.name, "state document created");
            return Ok(ReconcileAction::AwaitChange);
        };
        let mut data = doc.load_data().map_err(ReconcileError::StateData)?;

        // ── Sync period gate ───────────────────────────────────────

        let sync_period = spec.sync_period();
        let sync_chrono = chrono::Duration::from_std(sync_period).unwrap_or(chrono::Duration::MAX);
        if let Some(last) = autoscaler.status.last_scale_time
            && now - last < sync_chrono
        {
            let wait = (last + sync_chrono - now).to_std().unwrap_or_default();
            debug!(autoscaler = %key, ?wait, "already scaled this sync period");
            return Ok(ReconcileAction::Requeue(wait));
        }

        // ── Current demand ─────────────────────────────────────────

        let scale = self
            .cluster
            .get_scale(&key.namespace, target)
            .await
            .map_err(ReconcileError::Scale)?;
        let current = scale.replicas;

        let gathered = self
            .metrics
            .gather(
                &spec.metrics,
                &key.namespace,
                &scale.selector,
                spec.cpu_initialization_period(),
                spec.initial_readiness_delay(),
            )
            .await
            .map_err(ReconcileError::Metrics)?;
        let demand = self
            .metrics
            .evaluate(&gathered, current, spec.tolerance())
            .map_err(ReconcileError::Metrics)?;

        // ── Models ─────────────────────────────────────────────────

        let mut candidates = vec![demand];
        candidates.extend(self.process_models(key, &spec, &mut data, demand, now).await);

        doc.store_data(&data).map_err(ReconcileError::StateData)?;
        self.cluster
            .update_state_document(&doc)
            .await
            .map_err(ReconcileError::PersistState)?;

        // ── Decision ───────────────────────────────────────────────

        let proposed = strategy::decide(spec.decision_type(), &candidates);
        let scaling = Behavior::with_defaults(spec.behavior.as_ref());
        let status = &mut autoscaler.status;

        let recommendation = TimestampedReplicas::new(now, proposed);
        let mut scale_up_replicas = behavior::prune_to_window(
            &status.scale_up_replica_history,
            scaling.scale_up.stabilization_window_seconds,
            now,
        );
        scale_up_replicas.push(recommendation.clone());
        let mut scale_down_replicas = behavior::prune_to_window(
            &status.scale_down_replica_history,
            scaling.scale_down.stabilization_window_seconds,
            now,
        );
        scale_down_replicas.push(recommendation);

        let up_period = scaling.scale_up.longest_policy_period();
        let down_period = scaling.scale_down.longest_policy_period();
        let mut scale_up_events =
            behavior::prune_to_window(&status.scale_up_event_history, up_period, now);
        let mut scale_down_events =
            behavior::prune_to_window(&status.scale_down_event_history, down_period, now);

        let desired = behavior::decide(
            &scaling,
            current,
            proposed,
            spec.min_replicas(),
            spec.max_replicas,
            Histories {
                scale_up_replicas: &scale_up_replicas,
                scale_down_replicas: &scale_down_replicas,
                scale_up_events: &scale_up_events,
                scale_down_events: &scale_down_events,
            },
            now,
        );

        if desired != current {
            self.cluster
                .update_scale(&key.namespace, target, desired)
                .await
                .map_err(ReconcileError::ScaleWrite)?;
            info!(
                autoscaler = %key,
                target = %spec.scale_target_ref,
                from = current,
                to = desired,
                "scaled"
            );

            if desired > current {
                scale_up_events.push(TimestampedReplicas::new(now, desired - current));
                scale_up_events = behavior::prune_to_window(&scale_up_events, up_period, now);
            } else {
                scale_down_events.push(TimestampedReplicas::new(now, current - desired));
                scale_down_events = behavior::prune_to_window(&scale_down_events, down_period, now);
            }
        }

        status.last_scale_time = Some(now);
        status.current_replicas = current;
        status.desired_replicas = desired;
        status.scale_up_replica_history = scale_up_replicas;
        status.scale_down_replica_history = scale_down_replicas;
        status.scale_up_event_history = scale_up_events;
        status.scale_down_event_history = scale_down_events;
        status.current_metrics = gathered.iter().map(|m| m.status()).collect();

        self.cluster
            .update_autoscaler_status(key, status)
            .await
            .map_err(ReconcileError::Status)?;

        debug!(
            autoscaler = %key,
            demand,
            proposed,
            current,
            desired,
            "reconciled"
        );
        Ok(ReconcileAction::Requeue(sync_period))
    }

    /// Feed the current demand to every model and collect the forecasts
    /// of those due this tick. Model failures are logged and skipped.
    async fn process_models(
        &self,
        key: &ObjectKey,
        spec: &AutoscalerSpec,
        data: &mut PredictiveAutoscalerData,
        demand: i32,
        now: DateTime<Utc>,
    ) -> Vec<i32> {
        let mut forecasts = Vec::new();

        for model in &spec.models {
            // Changes reach `data` only when the model completes the tick
            // or the skip itself is recorded.
            let mut history = match data.model_histories.get(&model.name).cloned() {
                Some(stored) if stored.kind != model.kind => {
                    info!(autoscaler = %key, model = %model.name, from = %stored.kind, to = %model.kind,
                        "model type changed, discarding history");
                    data.model_histories
                        .insert(model.name.clone(), ModelHistory::new(model.kind));
                    continue;
                }
                Some(stored) => stored,
                None => ModelHistory::new(model.kind),
            };

            if let Some(interval) = &model.start_interval {
                match history.start_time {
                    None => {
                        let start = next_multiple(now, interval.as_chrono());
                        history.start_time = Some(start);
                        debug!(autoscaler = %key, model = %model.name, %start, "start time scheduled");
                        data.model_histories.insert(model.name.clone(), history);
                        continue;
                    }
                    Some(start) if now < start => {
                        debug!(autoscaler = %key, model = %model.name, %start, "before start time");
                        continue;
                    }
                    Some(_) => {}
                }
            }

            if let Some(reset) = &model.reset_duration
                && let Some(latest) = history.replica_history.iter().map(|h| h.time).max()
                && now - latest > reset.as_chrono()
            {
                history.replica_history.clear();
                if let Some(interval) = &model.start_interval {
                    let start = next_multiple(now, interval.as_chrono());
                    history.start_time = Some(start);
                    debug!(autoscaler = %key, model = %model.name, %latest, %start,
                        "history reset, start time rescheduled");
                } else {
                    debug!(autoscaler = %key, model = %model.name, %latest, "history reset");
                }
                data.model_histories.insert(model.name.clone(), history);
                continue;
            }

            history
                .replica_history
                .push(TimestampedReplicas::new(now, demand));

            if history.sync_periods_passed >= model.per_sync_period() {
                match self
                    .predicter
                    .get_prediction(model, &history.replica_history)
                    .await
                {
                    Ok(forecast) => {
                        debug!(autoscaler = %key, model = %model.name, forecast, "model forecast");
                        forecasts.push(forecast);
                        history.sync_periods_passed = 1;
                    }
                    Err(e) => {
                        warn!(autoscaler = %key, model = %model.name, error = %e, "prediction failed, skipping model");
                        continue;
                    }
                }
            } else {
                history.sync_periods_passed += 1;
            }

            let entries = std::mem::take(&mut history.replica_history);
            match self.predicter.prune_history(model, entries) {
                Ok(pruned) => {
                    history.replica_history = pruned;
                    data.model_histories.insert(model.name.clone(), history);
                }
                Err(e) => {
                    warn!(autoscaler = %key, model = %model.name, error = %e, "failed to prune history, skipping model");
                }
            }
        }

        data.model_histories
            .retain(|name, _| spec.models.iter().any(|m| &m.name == name));

        forecasts
    }
}

/// The first `interval` boundary (counted from the Unix epoch) strictly
/// after `now`, found by rounding `now` to the nearest boundary.
pub fn next_multiple(now: DateTime<Utc>, interval: chrono::Duration) -> DateTime<Utc> {
    let step = interval.num_milliseconds();
    if step <= 0 {
        return now;
    }

    let millis = now.timestamp_millis();
    let offset = millis.rem_euclid(step);
    let mut rounded = millis - offset;
    if offset * 2 >= step {
        rounded += step;
    }
    if rounded <= millis {
        rounded += step;
    }

    DateTime::from_timestamp_millis(rounded).unwrap_or(now + interval)
}
