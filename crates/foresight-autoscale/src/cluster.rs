//! Cluster seam — the object API the reconciler reads and writes through.

use async_trait::async_trait;
use foresight_state::{
    AutoscalerStatus, CrossVersionObjectReference, ObjectKey, PredictiveAutoscaler, Scale,
    StateDocument,
};

use crate::error::ClusterResult;

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Get an autoscaler; `None` when it does not exist.
    async fn get_autoscaler(&self, key: &ObjectKey) -> ClusterResult<Option<PredictiveAutoscaler>>;

    async fn list_autoscalers(&self) -> ClusterResult<Vec<ObjectKey>>;

    /// Replace the status subresource of an autoscaler.
    async fn update_autoscaler_status(
        &self,
        key: &ObjectKey,
        status: &AutoscalerStatus,
    ) -> ClusterResult<()>;

    /// Get the state document owned by an autoscaler.
    async fn get_state_document(&self, owner: &ObjectKey) -> ClusterResult<Option<StateDocument>>;

    async fn create_state_document(&self, doc: &StateDocument) -> ClusterResult<()>;

    async fn update_state_document(&self, doc: &StateDocument) -> ClusterResult<()>;

    /// Get the scale subresource of a workload.
    async fn get_scale(
        &self,
        namespace: &str,
        target: &CrossVersionObjectReference,
    ) -> ClusterResult<Scale>;

    /// Set the desired replica count of a workload.
    async fn update_scale(
        &self,
        namespace: &str,
        target: &CrossVersionObjectReference,
        replicas: i32,
    ) -> ClusterResult<Scale>;
}
