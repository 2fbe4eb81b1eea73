//! Snapshots and traces
//!
//! Every run produces an ordered sequence of [`StateSnapshot`]s:
//!
//! ```text
//! step 0  __start__         Started    (initial state, nothing executed yet)
//! step 1  decide            Running    (state after merging decide's update)
//! step 2  answer            Finished   (router/edge pointed at __end__)
//! ```
//!
//! A failed run ends with a `Failed` snapshot whose `failure` field says why.
//! Snapshots are emitted incrementally through a [`SnapshotStream`] and can be
//! collected into a [`Trace`].

use crate::error::{ExecutionFailure, GraphError, Result};
use crate::graph::{NodeId, END, START};
use crate::state::GraphState;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use uuid::Uuid;

/// Stream of snapshots from a running graph
pub type SnapshotStream<S> = Pin<Box<dyn Stream<Item = StateSnapshot<S>> + Send>>;

/// Where a snapshot sits in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Initial state, before the entry node runs
    Started,
    /// A node ran and the run continues
    Running,
    /// A node ran and its successor is the terminal sentinel
    Finished,
    /// The run stopped on a failure
    Failed,
}

/// One read-only entry of a trace
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "S: Serialize, S::Update: Serialize"))]
pub struct StateSnapshot<S: GraphState> {
    /// Identifies the run this snapshot belongs to
    pub run_id: Uuid,
    /// 0 for the initial snapshot, then one per executed node
    pub step: usize,
    /// Node that produced this snapshot ([`START`] for the initial one)
    pub node: NodeId,
    /// Successor chosen after this node, if any
    pub next: Option<NodeId>,
    pub status: StepStatus,
    /// The node's partial update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<S::Update>,
    /// Full state after merging
    pub state: S,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ExecutionFailure>,
    pub timestamp: DateTime<Utc>,
}

impl<S: GraphState> StateSnapshot<S> {
    pub(crate) fn initial(run_id: Uuid, state: S, entry: NodeId) -> Self {
        Self {
            run_id,
            step: 0,
            node: START.to_string(),
            next: Some(entry),
            status: StepStatus::Started,
            update: None,
            state,
            failure: None,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn completed(
        run_id: Uuid,
        step: usize,
        node: NodeId,
        update: S::Update,
        state: S,
        next: NodeId,
    ) -> Self {
        let status = if next == END {
            StepStatus::Finished
        } else {
            StepStatus::Running
        };
        Self {
            run_id,
            step,
            node,
            next: Some(next),
            status,
            update: Some(update),
            state,
            failure: None,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn failed(
        run_id: Uuid,
        step: usize,
        node: NodeId,
        update: Option<S::Update>,
        state: S,
        failure: ExecutionFailure,
    ) -> Self {
        Self {
            run_id,
            step,
            node,
            next: None,
            status: StepStatus::Failed,
            update,
            state,
            failure: Some(failure),
            timestamp: Utc::now(),
        }
    }

    /// True for the last snapshot of a run
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, StepStatus::Finished | StepStatus::Failed)
    }
}

/// All snapshots of one run, in emission order
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "S: Serialize, S::Update: Serialize"))]
pub struct Trace<S: GraphState> {
    snapshots: Vec<StateSnapshot<S>>,
}

impl<S: GraphState> Trace<S> {
    pub fn new(snapshots: Vec<StateSnapshot<S>>) -> Self {
        Self { snapshots }
    }

    pub fn snapshots(&self) -> &[StateSnapshot<S>] {
        &self.snapshots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StateSnapshot<S>> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn final_snapshot(&self) -> Option<&StateSnapshot<S>> {
        self.snapshots.last()
    }

    pub fn final_state(&self) -> Option<&S> {
        self.final_snapshot().map(|s| &s.state)
    }

    /// Failure that ended the run, if it failed
    pub fn failure(&self) -> Option<&ExecutionFailure> {
        self.final_snapshot().and_then(|s| s.failure.as_ref())
    }

    pub fn is_failed(&self) -> bool {
        self.failure().is_some()
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.final_snapshot().map(|s| s.status),
            Some(StepStatus::Finished)
        )
    }

    /// Executed node ids in order, followed by [`END`] when the run finished
    pub fn path(&self) -> Vec<&str> {
        let mut path: Vec<&str> = self
            .snapshots
            .iter()
            .filter(|s| s.step > 0 && s.failure.is_none())
            .map(|s| s.node.as_str())
            .collect();
        if self.is_finished() {
            path.push(END);
        }
        path
    }

    /// How many times `node` executed and produced an update
    ///
    /// A node that failed mid-step is not counted.
    pub fn visits(&self, node: &str) -> usize {
        self.snapshots
            .iter()
            .filter(|s| s.step > 0 && s.node == node && s.update.is_some())
            .count()
    }

    /// Final state on success, the recorded failure as an error otherwise
    pub fn into_result(self) -> Result<S> {
        let last = self
            .snapshots
            .into_iter()
            .last()
            .ok_or_else(|| GraphError::Execution("run produced no snapshots".to_string()))?;
        match last.failure {
            Some(failure) => Err(failure.into()),
            None => Ok(last.state),
        }
    }
}

impl<S: GraphState> IntoIterator for Trace<S> {
    type Item = StateSnapshot<S>;
    type IntoIter = std::vec::IntoIter<StateSnapshot<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.into_iter()
    }
}

impl<'a, S: GraphState> IntoIterator for &'a Trace<S> {
    type Item = &'a StateSnapshot<S>;
    type IntoIter = std::slice::Iter<'a, StateSnapshot<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}

impl<S: GraphState> Default for Trace<S> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<S: GraphState> Extend<StateSnapshot<S>> for Trace<S> {
    fn extend<I: IntoIterator<Item = StateSnapshot<S>>>(&mut self, iter: I) {
        self.snapshots.extend(iter);
    }
}

impl<S: GraphState> FromIterator<StateSnapshot<S>> for Trace<S> {
    fn from_iter<I: IntoIterator<Item = StateSnapshot<S>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
