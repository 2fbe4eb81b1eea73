//! # selfrag-graph
//!
//! A small, typed state-machine engine for LLM workflows.
//!
//! A workflow is a directed graph whose nodes transform a shared state and
//! whose edges are either fixed or decided at runtime by a router. Graphs may
//! contain cycles; every run is bounded by a step budget.
//!
//! ```text
//!  StateGraph (builder) ──compile()──▶ CompiledGraph ──stream()/invoke()──▶ StateSnapshot*
//!        │                                   │
//!   add_node / add_edge               validated Graph + ExecutionConfig
//!   add_conditional_edge
//! ```
//!
//! ## Core types
//!
//! - [`GraphState`]: the state container. A node returns a partial
//!   `Update`; the engine merges it with [`GraphState::merge`].
//! - [`Node`]: one processing step. Receives the state read-only.
//! - [`Edge`]: a fixed successor or a router plus its declared branches.
//! - [`CompiledGraph`]: executes the graph, one node at a time, emitting a
//!   [`StateSnapshot`] after each step.
//! - [`ChatModel`](llm::ChatModel): provider-agnostic LLM interface used by
//!   model-backed nodes.
//!
//! ## Quick start
//!
//! ```rust
//! use selfrag_graph::{NodeFuture, StateGraph, END};
//! use serde_json::{json, Value};
//!
//! # #[tokio::main]
//! # async fn main() -> selfrag_graph::Result<()> {
//! let mut graph = StateGraph::<Value>::new();
//! graph.add_node_fn("greet", |state: Value| -> NodeFuture<Value> {
//!     Box::pin(async move {
//!         let name = state["name"].as_str().unwrap_or("world").to_string();
//!         Ok(json!({ "greeting": format!("hello {}", name) }))
//!     })
//! });
//! graph.set_entry("greet");
//! graph.add_edge("greet", END);
//!
//! let trace = graph.compile()?.invoke(json!({"name": "graph"})).await;
//! assert_eq!(trace.final_state().unwrap()["greeting"], "hello graph");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod llm;
pub mod messages;
pub mod node;
pub mod state;
pub mod stream;
pub mod visualization;

pub use builder::StateGraph;
pub use compiled::{CompiledGraph, ExecutionConfig, DEFAULT_MAX_STEPS};
pub use error::{ExecutionFailure, FailureKind, GraphError, NodeError, Result};
pub use graph::{Edge, Graph, NodeId, RouterFn, END, START};
pub use messages::{Message, MessageRole};
pub use node::{BoxedNode, FnNode, Node, NodeFuture};
pub use state::{GraphState, FAILURE_KEY};
pub use stream::{SnapshotStream, StateSnapshot, StepStatus, Trace};
pub use visualization::{visualize, VisualizationFormat, VisualizationOptions};
