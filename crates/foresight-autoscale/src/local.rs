//! Local cluster — the cluster seam backed by the embedded state store.
//!
//! Writes that would produce a watch event in a real cluster (applying
//! or deleting an autoscaler, creating a state document owned by one)
//! push the owning autoscaler's key onto the event channel.

use async_trait::async_trait;
use foresight_state::{
    AutoscalerStatus, CrossVersionObjectReference, ObjectKey, PredictiveAutoscaler, Scale,
    StateDocument, StateStore,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::cluster::ClusterClient;
use crate::error::{ClusterError, ClusterResult};

/// Sender half of the watch event channel.
pub type EventSender = mpsc::UnboundedSender<ObjectKey>;
/// Receiver half of the watch event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<ObjectKey>;

#[derive(Clone)]
pub struct LocalCluster {
    state: StateStore,
    events: Option<EventSender>,
}

impl LocalCluster {
    /// A cluster that emits no watch events.
    pub fn new(state: StateStore) -> Self {
        Self {
            state,
            events: None,
        }
    }

    /// A cluster plus the receiver of its watch events.
    pub fn with_events(state: StateStore) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                state,
                events: Some(tx),
            },
            rx,
        )
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    fn notify(&self, key: ObjectKey) {
        if let Some(events) = &self.events
            && events.send(key.clone()).is_err()
        {
            debug!(autoscaler = %key, "watch event dropped, no receiver");
        }
    }

    /// Create or replace an autoscaler and emit a watch event for it.
    pub fn apply_autoscaler(&self, autoscaler: &PredictiveAutoscaler) -> ClusterResult<()> {
        self.state.put_autoscaler(autoscaler)?;
        self.notify(autoscaler.key());
        Ok(())
    }

    /// Delete an autoscaler together with the documents it owns.
    /// Returns true if it existed.
    pub fn delete_autoscaler(&self, key: &ObjectKey) -> ClusterResult<bool> {
        let existed = self.state.delete_autoscaler(key)?;
        if existed {
            self.notify(key.clone());
        }
        Ok(existed)
    }
}

#[async_trait]
impl ClusterClient for LocalCluster {
    async fn get_autoscaler(&self, key: &ObjectKey) -> ClusterResult<Option<PredictiveAutoscaler>> {
        Ok(self.state.get_autoscaler(key)?)
    }

    async fn list_autoscalers(&self) -> ClusterResult<Vec<ObjectKey>> {
        Ok(self
            .state
            .list_autoscalers()?
            .iter()
            .map(PredictiveAutoscaler::key)
            .collect())
    }

    async fn update_autoscaler_status(
        &self,
        key: &ObjectKey,
        status: &AutoscalerStatus,
    ) -> ClusterResult<()> {
        self.state.update_autoscaler_status(key, status)?;
        Ok(())
    }

    async fn get_state_document(&self, owner: &ObjectKey) -> ClusterResult<Option<StateDocument>> {
        Ok(self.state.get_state_document(owner)?)
    }

    async fn create_state_document(&self, doc: &StateDocument) -> ClusterResult<()> {
        self.state.create_state_document(doc)?;
        // Owner reference trigger.
        self.notify(ObjectKey::new(&doc.namespace, &doc.owner.name));
        Ok(())
    }

    async fn update_state_document(&self, doc: &StateDocument) -> ClusterResult<()> {
        self.state.update_state_document(doc)?;
        Ok(())
    }

    async fn get_scale(
        &self,
        namespace: &str,
        target: &CrossVersionObjectReference,
    ) -> ClusterResult<Scale> {
        self.state
            .get_scale(namespace, target)?
            .ok_or_else(|| ClusterError::NotFound(Scale::key_for(namespace, target)))
    }

    async fn update_scale(
        &self,
        namespace: &str,
        target: &CrossVersionObjectReference,
        replicas: i32,
    ) -> ClusterResult<Scale> {
        Ok(self.state.update_scale_replicas(namespace, target, replicas)?)
    }
}
