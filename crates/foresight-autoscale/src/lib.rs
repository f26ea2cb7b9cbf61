//! foresight-autoscale — predictive reconcile loop for horizontal scaling.
//!
//! Each reconcile tick computes the replica count a stock autoscaler
//! would pick from the current metrics ("current demand"), feeds it to
//! every configured prediction model, reduces demand and forecasts with
//! the autoscaler's decision strategy and applies the scaling behavior
//! before writing the scale subresource.
//!
//! # Tick
//!
//! ```text
//! demand    = evaluate(gather(metrics))
//! forecasts = [model.predict(history + (now, demand)) for due models]
//! proposed  = strategy(decisionType, [demand] + forecasts)
//! desired   = behavior(current, proposed, histories)   // stabilize, rate-limit
//! desired   = clamp(desired, minReplicas, maxReplicas)
//! ```
//!
//! Model histories live in a state document owned by the autoscaler; the
//! scale-up/down recommendation and event histories live in its status.
//! The [`Controller`] serializes ticks per autoscaler and requeues each
//! one after its sync period.

pub mod behavior;
pub mod cluster;
pub mod controller;
pub mod error;
pub mod local;
pub mod metrics;
pub mod reconciler;
pub mod strategy;
pub mod validate;

pub use cluster::ClusterClient;
pub use controller::{Controller, ControllerConfig, WorkQueue};
pub use error::{ClusterError, ClusterResult, ReconcileError};
pub use local::{EventReceiver, EventSender, LocalCluster};
pub use metrics::{GatheredMetric, MetricEvaluator, MetricsError, ReadingsEvaluator};
pub use reconciler::{ReconcileAction, Reconciler, next_multiple};
pub use validate::{ValidationError, validate};
