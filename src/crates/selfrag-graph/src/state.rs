//! State container and merge semantics
//!
//! A graph run threads one state value through every node. Nodes never
//! mutate it; they return a *partial update* which the engine merges into the
//! current state to produce the next snapshot:
//!
//! ```text
//! state_0 ──node A──▶ update_A ──merge──▶ state_1 ──node B──▶ update_B ──merge──▶ state_2
//! ```
//!
//! Merging overlays only the fields present in the update and never deletes a
//! field. Every merged state is a fresh value, so snapshots already handed to
//! a caller can never be rewritten.
//!
//! # Implementing a state type
//!
//! Typed states usually pair a struct with an "all optional" update struct:
//!
//! ```rust
//! use selfrag_graph::{ExecutionFailure, GraphState};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Counter {
//!     count: u32,
//!     note: Option<String>,
//! }
//!
//! #[derive(Debug, Clone, Default)]
//! struct CounterUpdate {
//!     count: Option<u32>,
//!     note: Option<String>,
//! }
//!
//! impl GraphState for Counter {
//!     type Update = CounterUpdate;
//!
//!     fn merge(&self, update: CounterUpdate) -> Self {
//!         Counter {
//!             count: update.count.unwrap_or(self.count),
//!             note: update.note.or_else(|| self.note.clone()),
//!         }
//!     }
//!
//!     fn fail(&self, failure: &ExecutionFailure) -> Self {
//!         Counter { note: Some(failure.to_string()), ..self.clone() }
//!     }
//! }
//! ```

use crate::error::ExecutionFailure;
use std::fmt::Debug;

/// Key under which [`serde_json::Value`] states record a terminal failure
pub const FAILURE_KEY: &str = "__failure__";

/// A state type that can be threaded through a graph
pub trait GraphState: Clone + Debug + Send + Sync + 'static {
    /// Partial update produced by a node
    type Update: Clone + Debug + Send + Sync + 'static;

    /// Overlay `update` on top of `self`, returning the next snapshot.
    ///
    /// Fields absent from the update keep their current value.
    fn merge(&self, update: Self::Update) -> Self;

    /// Produce the terminal snapshot for a failed run.
    ///
    /// Called exactly once, when a node or router fails or the step budget
    /// runs out. Implementations should record the failure in a dedicated
    /// field rather than overloading domain fields.
    fn fail(&self, failure: &ExecutionFailure) -> Self;
}

/// Untyped JSON state: objects merge key-by-key, right side wins.
impl GraphState for serde_json::Value {
    type Update = serde_json::Value;

    fn merge(&self, update: serde_json::Value) -> Self {
        // Null updates are "no change"
        if update.is_null() {
            return self.clone();
        }

        let Some(right) = update.as_object() else {
            // Only objects name keys; anything else would clobber the state
            tracing::warn!("Ignoring non-object state update: {}", update);
            return self.clone();
        };

        let mut merged = self.as_object().cloned().unwrap_or_default();
        for (key, value) in right {
            merged.insert(key.clone(), value.clone());
        }
        serde_json::Value::Object(merged)
    }

    fn fail(&self, failure: &ExecutionFailure) -> Self {
        let mut obj = self.as_object().cloned().unwrap_or_default();
        obj.insert(
            FAILURE_KEY.to_string(),
            serde_json::to_value(failure).unwrap_or(serde_json::Value::Null),
        );
        serde_json::Value::Object(obj)
    }
}
