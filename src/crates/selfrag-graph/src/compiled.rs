//! Compiled graph runtime
//!
//! [`CompiledGraph`] walks a validated [`Graph`] one node at a time:
//!
//! ```text
//!   ┌──────────────┐  execute   ┌──────────┐  merge   ┌────────────┐
//!   │ current node │──────────▶│  update  │────────▶│ new state  │──▶ snapshot
//!   └──────────────┘            └──────────┘          └─────┬──────┘
//!          ▲                                                │ edge / router
//!          └────────────────────────────────────────────────┘ (until __end__)
//! ```
//!
//! Execution is strictly sequential: the engine awaits each node before
//! resolving its successor, so there is never more than one node in flight
//! and the state needs no locking. Cycles are allowed; termination is
//! guaranteed by [`ExecutionConfig::max_steps`] regardless of what the
//! routers do.
//!
//! Failures never escape as errors. A failing node, a router that returns an
//! undeclared target, or an exhausted step budget all end the run with a
//! [`StepStatus::Failed`](crate::StepStatus) snapshot produced by
//! [`GraphState::fail`].

use crate::error::{ExecutionFailure, GraphError, Result};
use crate::graph::{Graph, END};
use crate::state::GraphState;
use crate::stream::{SnapshotStream, StateSnapshot, Trace};
use crate::visualization::{visualize, VisualizationOptions};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

/// Default upper bound on node executions per run
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Runtime limits for a compiled graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Maximum number of node executions in one run
    pub max_steps: usize,
}

impl ExecutionConfig {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(GraphError::Configuration(
                "max_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// A validated, executable graph
pub struct CompiledGraph<S: GraphState> {
    graph: Arc<Graph<S>>,
    config: ExecutionConfig,
}

impl<S: GraphState> Clone for CompiledGraph<S> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            config: self.config,
        }
    }
}

impl<S: GraphState> std::fmt::Debug for CompiledGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .finish()
    }
}

impl<S: GraphState> CompiledGraph<S> {
    pub(crate) fn new(graph: Graph<S>, config: ExecutionConfig) -> Self {
        Self {
            graph: Arc::new(graph),
            config,
        }
    }

    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn visualize(&self, options: &VisualizationOptions) -> String {
        visualize(&self.graph, options)
    }

    /// Run to completion and collect every snapshot
    pub async fn invoke(&self, initial: S) -> Trace<S> {
        self.stream(initial).collect::<Trace<S>>().await
    }

    /// Run the graph, yielding each snapshot as soon as it exists
    ///
    /// The first item is always the initial snapshot; the last item is either
    /// a `Finished` or a `Failed` snapshot.
    pub fn stream(&self, initial: S) -> SnapshotStream<S> {
        let graph = Arc::clone(&self.graph);
        let max_steps = self.config.max_steps;
        let run_id = Uuid::new_v4();

        Box::pin(async_stream::stream! {
            // compile() guarantees an entry point
            let entry = graph.entry().unwrap_or(END).to_string();
            tracing::info!("Starting run {} at '{}'", run_id, entry);

            let mut state = initial;
            yield StateSnapshot::initial(run_id, state.clone(), entry.clone());

            let mut current = entry;
            let mut step = 0usize;

            loop {
                if step >= max_steps {
                    let failure = ExecutionFailure::step_limit(current.clone(), max_steps);
                    tracing::warn!("Run {} stopped: {}", run_id, failure);
                    state = state.fail(&failure);
                    yield StateSnapshot::failed(run_id, step + 1, current, None, state, failure);
                    break;
                }
                step += 1;

                let node = match graph.node(&current) {
                    Some(node) => Arc::clone(node),
                    None => {
                        let failure = ExecutionFailure::routing(current.clone(), "node does not exist");
                        tracing::warn!("Run {} stopped: {}", run_id, failure);
                        state = state.fail(&failure);
                        yield StateSnapshot::failed(run_id, step, current, None, state, failure);
                        break;
                    }
                };

                tracing::debug!("Run {} step {}: executing '{}'", run_id, step, current);
                let update = match node.execute(&state).await {
                    Ok(update) => update,
                    Err(error) => {
                        let failure = ExecutionFailure::node_execution(current.clone(), error.as_ref());
                        tracing::warn!("Run {} stopped: {}", run_id, failure);
                        state = state.fail(&failure);
                        yield StateSnapshot::failed(run_id, step, current, None, state, failure);
                        break;
                    }
                };

                state = state.merge(update.clone());

                match graph.resolve_next(&current, &state) {
                    Ok(next) => {
                        tracing::info!("'{}' -> '{}'", current, next);
                        let finished = next == END;
                        yield StateSnapshot::completed(run_id, step, current, update, state.clone(), next.clone());
                        if finished {
                            tracing::info!("Run {} finished after {} steps", run_id, step);
                            break;
                        }
                        current = next;
                    }
                    Err(failure) => {
                        tracing::warn!("Run {} stopped: {}", run_id, failure);
                        state = state.fail(&failure);
                        yield StateSnapshot::failed(run_id, step, current, Some(update), state, failure);
                        break;
                    }
                }
            }
        })
    }
}
