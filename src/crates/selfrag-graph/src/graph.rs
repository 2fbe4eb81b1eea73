//! Low-level graph representation
//!
//! [`Graph`] is an explicit adjacency structure: every node id maps to exactly
//! one outgoing [`Edge`], which is either a fixed successor or a router with a
//! declared set of possible targets. Control flow therefore lives in data, not
//! in nested conditionals, and can be validated before anything runs.
//!
//! Most users build graphs through [`StateGraph`](crate::StateGraph) rather
//! than touching this module directly.

use crate::error::ExecutionFailure;
use crate::node::BoxedNode;
use crate::state::GraphState;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Node identifier
pub type NodeId = String;

/// Label of the synthetic snapshot emitted before the entry node runs
pub const START: &str = "__start__";

/// Terminal sentinel. Routing to `END` stops the run.
pub const END: &str = "__end__";

/// Router: a total function from state to the next node id
pub type RouterFn<S> = Arc<dyn Fn(&S) -> NodeId + Send + Sync>;

/// Outgoing edge of a node
pub enum Edge<S> {
    /// Unconditional successor
    Direct(NodeId),

    /// Router-determined successor
    Conditional {
        /// Routing function
        router: RouterFn<S>,
        /// Every id the router may return
        branches: Vec<NodeId>,
    },
}

impl<S> Edge<S> {
    /// All ids this edge can lead to
    pub fn targets(&self) -> &[NodeId] {
        match self {
            Edge::Direct(to) => std::slice::from_ref(to),
            Edge::Conditional { branches, .. } => branches,
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Edge::Conditional { .. })
    }
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Edge::Direct(to) => Edge::Direct(to.clone()),
            Edge::Conditional { router, branches } => Edge::Conditional {
                router: Arc::clone(router),
                branches: branches.clone(),
            },
        }
    }
}

impl<S> fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct(node_id) => f.debug_tuple("Direct").field(node_id).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Graph topology: nodes, one outgoing edge per node, and an entry point
pub struct Graph<S: GraphState> {
    nodes: HashMap<NodeId, BoxedNode<S>>,
    /// Insertion order, for deterministic rendering
    order: Vec<NodeId>,
    edges: HashMap<NodeId, Edge<S>>,
    entry: Option<NodeId>,
    /// Construction mistakes (duplicates, reserved ids), reported by `validate`
    problems: Vec<String>,
}

impl<S: GraphState> Graph<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            entry: None,
            problems: Vec::new(),
        }
    }

    /// Register a node. Re-using an id is reported by [`Graph::validate`].
    pub fn add_node(&mut self, id: NodeId, node: BoxedNode<S>) {
        if id == START || id == END {
            self.problems.push(format!("Node id {} is reserved", id));
            return;
        }
        if self.nodes.insert(id.clone(), node).is_some() {
            self.problems.push(format!("Node {} was added more than once", id));
        } else {
            self.order.push(id);
        }
    }

    /// Set the outgoing edge of `from`. A second edge for the same node is an error.
    pub fn add_edge(&mut self, from: NodeId, edge: Edge<S>) {
        if self.edges.contains_key(&from) {
            self.problems
                .push(format!("Node {} has more than one outgoing edge", from));
            return;
        }
        self.edges.insert(from, edge);
    }

    pub fn set_entry(&mut self, node: NodeId) {
        self.entry = Some(node);
    }

    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn node(&self, id: &str) -> Option<&BoxedNode<S>> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge<S>> {
        self.edges.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve the successor of `from` for the given (already merged) state.
    pub fn resolve_next(&self, from: &str, state: &S) -> Result<NodeId, ExecutionFailure> {
        match self.edges.get(from) {
            Some(Edge::Direct(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, branches }) => {
                let target = router(state);
                if branches.iter().any(|b| *b == target) {
                    tracing::debug!("Router at '{}' chose '{}'", from, target);
                    Ok(target)
                } else {
                    Err(ExecutionFailure::routing(
                        from,
                        format!(
                            "router returned '{}', expected one of [{}]",
                            target,
                            branches.join(", ")
                        ),
                    ))
                }
            }
            None => Err(ExecutionFailure::routing(from, "node has no outgoing edge")),
        }
    }

    /// Validate the topology
    ///
    /// Checks, in order:
    /// 1. no construction problems (duplicate nodes/edges, reserved ids)
    /// 2. the entry point is set and exists
    /// 3. every edge source and target exists (`END` is always a valid target)
    /// 4. every conditional edge declares at least one branch
    /// 5. every node has an outgoing edge
    /// 6. every node is reachable from the entry
    /// 7. `END` is reachable from every node
    pub fn validate(&self) -> Result<(), String> {
        if let Some(problem) = self.problems.first() {
            return Err(problem.clone());
        }

        let entry = self
            .entry
            .as_ref()
            .ok_or_else(|| "Entry point is not set".to_string())?;
        if !self.nodes.contains_key(entry) {
            return Err(format!("Entry point {} does not exist", entry));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(format!("Edge source {} does not exist", from));
            }
            if edge.targets().is_empty() {
                return Err(format!("Conditional edge from {} declares no branches", from));
            }
            for to in edge.targets() {
                if !self.nodes.contains_key(to) && to != END {
                    return Err(format!("Edge target {} does not exist", to));
                }
            }
        }

        for id in &self.order {
            if !self.edges.contains_key(id) {
                return Err(format!("Node {} has no outgoing edge", id));
            }
        }

        let reachable = self.reachable_from(entry);
        for id in &self.order {
            if !reachable.contains(id.as_str()) {
                return Err(format!("Node {} is unreachable from entry {}", id, entry));
            }
        }

        let finishing = self.nodes_reaching_end();
        for id in &self.order {
            if !finishing.contains(id.as_str()) {
                return Err(format!("{} is unreachable from node {}", END, id));
            }
        }

        Ok(())
    }

    fn reachable_from<'a>(&'a self, entry: &'a str) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([entry]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(edge) = self.edges.get(id) {
                for to in edge.targets() {
                    if to != END {
                        queue.push_back(to.as_str());
                    }
                }
            }
        }
        seen
    }

    /// Nodes with at least one path to `END`
    fn nodes_reaching_end(&self) -> HashSet<&str> {
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, edge) in &self.edges {
            for to in edge.targets() {
                reverse.entry(to.as_str()).or_default().push(from.as_str());
            }
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([END]);
        while let Some(id) = queue.pop_front() {
            if let Some(preds) = reverse.get(id) {
                for pred in preds {
                    if seen.insert(*pred) {
                        queue.push_back(*pred);
                    }
                }
            }
        }
        seen
    }
}

impl<S: GraphState> Default for Graph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> fmt::Debug for Graph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.order)
            .field("edges", &self.edges)
            .field("entry", &self.entry)
            .finish()
    }
}
