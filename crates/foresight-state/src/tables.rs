//! redb table definitions for the Foresight state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized resources).
//! Keys are slash-separated paths rooted at the namespace.

use redb::TableDefinition;

/// Predictive autoscalers keyed by `{namespace}/{name}`.
pub const AUTOSCALERS: TableDefinition<&str, &[u8]> = TableDefinition::new("autoscalers");

/// Per-autoscaler state documents keyed by `{namespace}/{document}`.
pub const STATE_DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("state_documents");

/// Scale subresources keyed by `{namespace}/{kind}/{name}`.
pub const SCALES: TableDefinition<&str, &[u8]> = TableDefinition::new("scales");

/// Latest metric readings keyed by `{namespace}/{selector}`.
pub const METRIC_READINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("metric_readings");
