//! Node abstraction
//!
//! A node is a transformation from the current state to a partial update.
//! It receives the state by shared reference, so it cannot mutate it, and it
//! returns either an update or a [`NodeError`]. On error the engine discards
//! the node's work entirely; there is no way to leave a half-applied update.

use crate::error::NodeError;
use crate::state::GraphState;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by closure-based nodes
pub type NodeFuture<U> = Pin<Box<dyn Future<Output = Result<U, NodeError>> + Send>>;

/// Shared handle to a node
pub type BoxedNode<S> = Arc<dyn Node<S>>;

/// A single processing step in a graph
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use selfrag_graph::{Node, NodeError};
/// use serde_json::{json, Value};
///
/// struct Greet;
///
/// #[async_trait]
/// impl Node<Value> for Greet {
///     async fn execute(&self, state: &Value) -> Result<Value, NodeError> {
///         let name = state["name"].as_str().unwrap_or("world");
///         Ok(json!({ "greeting": format!("hello {}", name) }))
///     }
/// }
/// ```
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    /// Compute this node's update for `state`.
    async fn execute(&self, state: &S) -> Result<S::Update, NodeError>;
}

/// Adapter turning a closure into a [`Node`]
///
/// The closure receives an owned clone of the state so the returned future
/// can be `'static`.
pub struct FnNode<F> {
    f: F,
}

impl<F> FnNode<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<S, F> Node<S> for FnNode<F>
where
    S: GraphState,
    F: Fn(S) -> NodeFuture<S::Update> + Send + Sync,
{
    async fn execute(&self, state: &S) -> Result<S::Update, NodeError> {
        (self.f)(state.clone()).await
    }
}
