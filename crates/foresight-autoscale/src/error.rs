//! Autoscaler error types.

use foresight_state::StateError;
use thiserror::Error;

use crate::metrics::MetricsError;

/// Errors returned by a cluster client.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ClusterError::NotFound(_) => true,
            ClusterError::State(e) => e.is_not_found(),
        }
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// A reconcile step that failed and should be retried.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to get autoscaler: {0}")]
    Load(#[source] ClusterError),

    #[error("failed to update status of resource: {0}")]
    Status(#[source] ClusterError),

    #[error("failed to get state document: {0}")]
    StateDocument(#[source] ClusterError),

    #[error("failed to create state document: {0}")]
    CreateStateDocument(#[source] ClusterError),

    #[error("failed to parse state document data: {0}")]
    StateData(#[source] StateError),

    #[error("failed to get scale subresource: {0}")]
    Scale(#[source] ClusterError),

    #[error("failed to calculate replicas based on metrics: {0}")]
    Metrics(#[source] MetricsError),

    #[error("failed to update state document: {0}")]
    PersistState(#[source] ClusterError),

    #[error("failed to scale resource: {0}")]
    ScaleWrite(#[source] ClusterError),
}
