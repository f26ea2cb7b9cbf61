//! foresight-state — resource schema and embedded state store for Foresight.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for predictive autoscalers, their per-autoscaler state documents,
//! the scale subresources of target workloads, and metric readings.
//!
//! # Architecture
//!
//! All resources are JSON-serialized into redb's `&[u8]` value columns,
//! keyed by slash-separated paths (`{namespace}/{name}`,
//! `{namespace}/{kind}/{name}`). A state document records its owning
//! autoscaler; deleting the autoscaler removes the document in the same
//! transaction.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
