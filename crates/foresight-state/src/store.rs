//! StateStore — redb-backed persistence for Foresight resources.
//!
//! Holds autoscalers, their state documents, scale subresources and
//! metric readings. All values are JSON-serialized into redb's `&[u8]`
//! value columns. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(AUTOSCALERS).map_err(map_err!(Table))?;
        txn.open_table(STATE_DOCUMENTS).map_err(map_err!(Table))?;
        txn.open_table(SCALES).map_err(map_err!(Table))?;
        txn.open_table(METRIC_READINGS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic record access ──────────────────────────────────────

    fn put<T: Serialize>(&self, table: Table, key: &str, value: &T) -> StateResult<()> {
        let value = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn list<T: DeserializeOwned>(&self, table: Table) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            results.push(serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?);
        }
        Ok(results)
    }

    /// Read-modify-write a record inside one write transaction.
    fn modify<T, F>(&self, table: Table, key: &str, f: F) -> StateResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated = {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            let existing = table
                .get(key)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| StateError::NotFound(key.to_string()))?;
            let mut value: T =
                serde_json::from_slice(&existing).map_err(map_err!(Deserialize))?;
            f(&mut value);
            let bytes = serde_json::to_vec(&value).map_err(map_err!(Serialize))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(map_err!(Write))?;
            value
        };
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(updated)
    }

    // ── Autoscalers ────────────────────────────────────────────────

    /// Insert or replace an autoscaler. The stored status is kept when
    /// the incoming object carries none.
    pub fn put_autoscaler(&self, autoscaler: &PredictiveAutoscaler) -> StateResult<()> {
        let key = autoscaler.table_key();
        let mut value = autoscaler.clone();
        if value.status == AutoscalerStatus::default()
            && let Some(existing) = self.get::<PredictiveAutoscaler>(AUTOSCALERS, &key)?
        {
            value.status = existing.status;
        }
        self.put(AUTOSCALERS, &key, &value)?;
        debug!(%key, "autoscaler stored");
        Ok(())
    }

    /// Get an autoscaler by its identity.
    pub fn get_autoscaler(&self, key: &ObjectKey) -> StateResult<Option<PredictiveAutoscaler>> {
        self.get(AUTOSCALERS, &key.table_key())
    }

    /// List all autoscalers.
    pub fn list_autoscalers(&self) -> StateResult<Vec<PredictiveAutoscaler>> {
        self.list(AUTOSCALERS)
    }

    /// Replace only the status of a stored autoscaler.
    pub fn update_autoscaler_status(
        &self,
        key: &ObjectKey,
        status: &AutoscalerStatus,
    ) -> StateResult<PredictiveAutoscaler> {
        let updated = self.modify(AUTOSCALERS, &key.table_key(), |autoscaler: &mut PredictiveAutoscaler| {
            autoscaler.status = status.clone();
        })?;
        debug!(%key, "autoscaler status updated");
        Ok(updated)
    }

    /// Delete an autoscaler and every state document it owns.
    /// Returns true if the autoscaler existed.
    pub fn delete_autoscaler(&self, key: &ObjectKey) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        let collected;
        {
            let mut table = txn.open_table(AUTOSCALERS).map_err(map_err!(Table))?;
            existed = table
                .remove(key.table_key().as_str())
                .map_err(map_err!(Write))?
                .is_some();

            let mut docs = txn.open_table(STATE_DOCUMENTS).map_err(map_err!(Table))?;
            let mut owned = Vec::new();
            for entry in docs.iter().map_err(map_err!(Read))? {
                let (doc_key, value) = entry.map_err(map_err!(Read))?;
                let doc: StateDocument =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if doc.is_owned_by(key) {
                    owned.push(doc_key.value().to_string());
                }
            }
            for doc_key in &owned {
                docs.remove(doc_key.as_str()).map_err(map_err!(Write))?;
            }
            collected = owned.len();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, collected, "autoscaler deleted");
        Ok(existed)
    }

    // ── State documents ────────────────────────────────────────────

    /// Get the state document belonging to an autoscaler.
    pub fn get_state_document(&self, owner: &ObjectKey) -> StateResult<Option<StateDocument>> {
        self.get(STATE_DOCUMENTS, &StateDocument::key_for(owner))
    }

    /// Create a state document. Fails if one already exists under its key.
    pub fn create_state_document(&self, doc: &StateDocument) -> StateResult<()> {
        let key = doc.table_key();
        let value = serde_json::to_vec(doc).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(STATE_DOCUMENTS).map_err(map_err!(Table))?;
            if table.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists(key));
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "state document created");
        Ok(())
    }

    /// Overwrite an existing state document (last writer wins).
    pub fn update_state_document(&self, doc: &StateDocument) -> StateResult<()> {
        let key = doc.table_key();
        self.modify(STATE_DOCUMENTS, &key, |stored: &mut StateDocument| {
            *stored = doc.clone();
        })?;
        debug!(%key, "state document updated");
        Ok(())
    }

    // ── Scales ─────────────────────────────────────────────────────

    /// Insert or replace a scale subresource.
    pub fn put_scale(&self, scale: &Scale) -> StateResult<()> {
        let key = scale.table_key();
        self.put(SCALES, &key, scale)?;
        debug!(%key, replicas = scale.replicas, "scale stored");
        Ok(())
    }

    /// Get the scale subresource of a workload.
    pub fn get_scale(
        &self,
        namespace: &str,
        target: &CrossVersionObjectReference,
    ) -> StateResult<Option<Scale>> {
        self.get(SCALES, &Scale::key_for(namespace, target))
    }

    /// Set the replica count of an existing scale subresource.
    pub fn update_scale_replicas(
        &self,
        namespace: &str,
        target: &CrossVersionObjectReference,
        replicas: i32,
    ) -> StateResult<Scale> {
        let key = Scale::key_for(namespace, target);
        let scale = self.modify(SCALES, &key, |scale: &mut Scale| {
            scale.replicas = replicas;
        })?;
        debug!(%key, replicas, "scale updated");
        Ok(scale)
    }

    // ── Metric readings ────────────────────────────────────────────

    /// Replace the readings recorded for a selector.
    pub fn put_metric_readings(&self, readings: &MetricReadings) -> StateResult<()> {
        let key = readings.table_key();
        self.put(METRIC_READINGS, &key, readings)?;
        debug!(%key, count = readings.readings.len(), "metric readings stored");
        Ok(())
    }

    /// Get the readings recorded for a selector.
    pub fn get_metric_readings(
        &self,
        namespace: &str,
        selector: &str,
    ) -> StateResult<Option<MetricReadings>> {
        self.get(METRIC_READINGS, &MetricReadings::key_for(namespace, selector))
    }
}
