//! Graph construction API
//!
//! [`StateGraph`] is the builder for typed graphs. Add nodes, wire each node
//! to exactly one successor (fixed or routed), pick an entry point, and
//! `compile()` to get a validated [`CompiledGraph`].
//!
//! ```rust
//! use selfrag_graph::{NodeFuture, StateGraph, END};
//! use serde_json::{json, Value};
//!
//! # fn main() -> selfrag_graph::Result<()> {
//! let mut graph = StateGraph::<Value>::new();
//!
//! graph.add_node_fn("count", |state: Value| -> NodeFuture<Value> {
//!     Box::pin(async move {
//!         let n = state["n"].as_i64().unwrap_or(0);
//!         Ok(json!({ "n": n + 1 }))
//!     })
//! });
//!
//! // Loop until the counter reaches three
//! graph.add_conditional_edge(
//!     "count",
//!     |state: &Value| if state["n"].as_i64() < Some(3) { "count" } else { END },
//!     ["count", END],
//! );
//! graph.set_entry("count");
//!
//! let compiled = graph.compile()?;
//! # Ok(())
//! # }
//! ```

use crate::compiled::{CompiledGraph, ExecutionConfig};
use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, RouterFn, START};
use crate::node::{FnNode, Node, NodeFuture};
use crate::state::GraphState;
use std::sync::Arc;

/// Builder for typed state graphs
pub struct StateGraph<S: GraphState> {
    graph: Graph<S>,
}

impl<S: GraphState> StateGraph<S> {
    /// Creates an empty graph builder
    pub fn new() -> Self {
        Self { graph: Graph::new() }
    }

    /// Add a node
    pub fn add_node<N>(&mut self, id: impl Into<NodeId>, node: N) -> &mut Self
    where
        N: Node<S> + 'static,
    {
        self.graph.add_node(id.into(), Arc::new(node));
        self
    }

    /// Add a node from a closure
    pub fn add_node_fn<F>(&mut self, id: impl Into<NodeId>, f: F) -> &mut Self
    where
        F: Fn(S) -> NodeFuture<S::Update> + Send + Sync + 'static,
    {
        self.graph.add_node(id.into(), Arc::new(FnNode::new(f)));
        self
    }

    /// Add an unconditional edge. An edge from [`START`] sets the entry point.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            self.graph.set_entry(to);
        } else {
            self.graph.add_edge(from, Edge::Direct(to));
        }
        self
    }

    /// Add a routed edge
    ///
    /// `branches` lists every id the router may return; a run whose router
    /// picks anything else ends in a routing failure.
    pub fn add_conditional_edge<F, R, B>(
        &mut self,
        from: impl Into<NodeId>,
        router: F,
        branches: B,
    ) -> &mut Self
    where
        F: Fn(&S) -> R + Send + Sync + 'static,
        R: Into<NodeId>,
        B: IntoIterator,
        B::Item: Into<NodeId>,
    {
        let router: RouterFn<S> = Arc::new(move |state: &S| router(state).into());
        self.graph.add_edge(
            from.into(),
            Edge::Conditional {
                router,
                branches: branches.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Set the entry node
    pub fn set_entry(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.graph.set_entry(node.into());
        self
    }

    /// Route `node` straight to the terminal sentinel
    pub fn add_finish(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.graph.add_edge(node.into(), Edge::Direct(crate::graph::END.to_string()));
        self
    }

    /// Validate and compile with the default [`ExecutionConfig`]
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        self.compile_with_config(ExecutionConfig::default())
    }

    /// Validate and compile with an explicit [`ExecutionConfig`]
    pub fn compile_with_config(self, config: ExecutionConfig) -> Result<CompiledGraph<S>> {
        config.validate()?;
        self.graph.validate().map_err(GraphError::Validation)?;
        Ok(CompiledGraph::new(self.graph, config))
    }

    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}
