//! Error types for graph construction and execution
//!
//! Two families of errors live here:
//!
//! - [`GraphError`] is returned from fallible API calls: compiling a graph,
//!   talking to a chat model, or converting a failed [`Trace`](crate::Trace)
//!   into a `Result`.
//! - [`ExecutionFailure`] is *data*, not a control-flow error. When a node or
//!   router fails mid-run the engine does not abort; it records an
//!   `ExecutionFailure` in a terminal snapshot so callers can tell
//!   "the pipeline failed" apart from "the pipeline answered".
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── Validation         - Graph structure errors (compile time)
//! ├── NodeExecution      - A node failed while running
//! ├── Execution          - Engine-level failures (routing, step limit)
//! ├── Model              - Chat model / provider failures
//! ├── Serialization      - JSON errors
//! └── Configuration      - Invalid engine configuration
//! ```

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Convenience result type using [`GraphError`]
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type returned by [`Node::execute`](crate::Node::execute).
///
/// Nodes wrap whatever their collaborator returned; the engine only needs the
/// display form to build an [`ExecutionFailure`].
pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

/// Comprehensive error type for graph operations
///
/// # Examples
///
/// ```rust
/// use selfrag_graph::error::GraphError;
///
/// let err = GraphError::node_execution("retrieve", "index unavailable");
/// assert_eq!(err.to_string(), "Node 'retrieve' execution failed: index unavailable");
/// ```
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure validation failed
    ///
    /// Raised by [`StateGraph::compile`](crate::StateGraph::compile) when the
    /// topology is unusable: a missing entry, an edge to an unknown node, a node
    /// without an outgoing edge, an unreachable node, or a node from which the
    /// terminal sentinel can never be reached.
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// Node execution failed with context
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed
        node: String,
        /// Error message from node execution
        error: String,
    },

    /// Execution error without a failing node body (routing, step limit)
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Chat model request failed
    ///
    /// Providers in the `llm` crate convert their own errors into this variant.
    #[error("Model error: {0}")]
    Model(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GraphError {
    /// Create a node execution error
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Why a run stopped before reaching the terminal sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The node body returned an error
    NodeExecution,
    /// A router returned a target outside its declared branches, or a node had
    /// no outgoing edge at run time
    Routing,
    /// The run exceeded [`ExecutionConfig::max_steps`](crate::ExecutionConfig)
    StepLimit,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::NodeExecution => "node execution",
            FailureKind::Routing => "routing",
            FailureKind::StepLimit => "step limit",
        };
        f.write_str(label)
    }
}

/// Terminal failure recorded in the last snapshot of a failed run
///
/// The engine hands this to [`GraphState::fail`](crate::GraphState::fail) so
/// the state type can surface a user-facing explanation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} failure at '{node}': {message}")]
pub struct ExecutionFailure {
    /// Node that was executing (or about to execute) when the run stopped
    pub node: NodeId,
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable detail
    pub message: String,
}

impl ExecutionFailure {
    /// A node body returned an error.
    pub fn node_execution(node: impl Into<NodeId>, error: &(dyn std::error::Error + Send + Sync)) -> Self {
        Self {
            node: node.into(),
            kind: FailureKind::NodeExecution,
            message: error.to_string(),
        }
    }

    /// Routing out of `node` did not resolve to a declared target.
    pub fn routing(node: impl Into<NodeId>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            kind: FailureKind::Routing,
            message: message.into(),
        }
    }

    /// The step budget ran out before `node` could execute.
    pub fn step_limit(node: impl Into<NodeId>, max_steps: usize) -> Self {
        Self {
            node: node.into(),
            kind: FailureKind::StepLimit,
            message: format!("step limit of {} reached before the run finished", max_steps),
        }
    }
}

impl From<ExecutionFailure> for GraphError {
    fn from(failure: ExecutionFailure) -> Self {
        match failure.kind {
            FailureKind::NodeExecution => GraphError::NodeExecution {
                node: failure.node,
                error: failure.message,
            },
            FailureKind::Routing | FailureKind::StepLimit => {
                GraphError::Execution(failure.to_string())
            }
        }
    }
}
