//! End-to-end engine behaviour with a typed state

use async_trait::async_trait;
use futures::StreamExt;
use selfrag_graph::{
    ExecutionConfig, ExecutionFailure, FailureKind, GraphState, Node, NodeError, StateGraph,
    StepStatus, END,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
struct Draft {
    text: String,
    attempts: u32,
    approved: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct DraftUpdate {
    text: Option<String>,
    attempts: Option<u32>,
    approved: Option<bool>,
}

impl GraphState for Draft {
    type Update = DraftUpdate;

    fn merge(&self, update: DraftUpdate) -> Self {
        Draft {
            text: update.text.unwrap_or_else(|| self.text.clone()),
            attempts: update.attempts.unwrap_or(self.attempts),
            approved: update.approved.unwrap_or(self.approved),
            error: self.error.clone(),
        }
    }

    fn fail(&self, failure: &ExecutionFailure) -> Self {
        Draft {
            error: Some(failure.to_string()),
            ..self.clone()
        }
    }
}

struct Write;

#[async_trait]
impl Node<Draft> for Write {
    async fn execute(&self, state: &Draft) -> Result<DraftUpdate, NodeError> {
        Ok(DraftUpdate {
            text: Some(format!("{}+", state.text)),
            attempts: Some(state.attempts + 1),
            ..Default::default()
        })
    }
}

/// Approves once the draft has at least `needed` edits
struct Review {
    needed: usize,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Node<Draft> for Review {
    async fn execute(&self, state: &Draft) -> Result<DraftUpdate, NodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DraftUpdate {
            approved: Some(state.text.len() >= self.needed),
            ..Default::default()
        })
    }
}

struct Explode;

#[async_trait]
impl Node<Draft> for Explode {
    async fn execute(&self, _state: &Draft) -> Result<DraftUpdate, NodeError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "reviewer offline",
        )))
    }
}

fn write_review_graph(needed: usize, calls: Arc<AtomicUsize>) -> StateGraph<Draft> {
    let mut graph = StateGraph::new();
    graph.add_node("write", Write);
    graph.add_node("review", Review { needed, calls });
    graph.set_entry("write");
    graph.add_edge("write", "review");
    graph.add_conditional_edge(
        "review",
        |s: &Draft| if s.approved { END } else { "write" },
        ["write", END],
    );
    graph
}

#[tokio::test]
async fn test_cycle_runs_until_approved() {
    let calls = Arc::new(AtomicUsize::new(0));
    let compiled = write_review_graph(3, calls.clone()).compile().unwrap();

    let trace = compiled.invoke(Draft::default()).await;

    assert!(trace.is_finished());
    assert_eq!(
        trace.path(),
        vec!["write", "review", "write", "review", "write", "review", END]
    );
    let last = trace.final_state().unwrap();
    assert_eq!(last.text, "+++");
    assert_eq!(last.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_step_limit_stops_endless_cycle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let compiled = write_review_graph(usize::MAX, calls.clone())
        .compile_with_config(ExecutionConfig::new(7))
        .unwrap();

    let trace = compiled.invoke(Draft::default()).await;

    let failure = trace.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::StepLimit);
    // Seven executions, then one failure snapshot
    assert_eq!(trace.len(), 1 + 7 + 1);
    assert_eq!(trace.visits("write") + trace.visits("review"), 7);
    assert!(trace.final_state().unwrap().error.is_some());
}

#[tokio::test]
async fn test_failed_node_keeps_prior_state() {
    let mut graph = StateGraph::new();
    graph.add_node("write", Write);
    graph.add_node("review", Explode);
    graph.set_entry("write");
    graph.add_edge("write", "review");
    graph.add_finish("review");

    let trace = graph.compile().unwrap().invoke(Draft::default()).await;

    let last = trace.final_snapshot().unwrap();
    assert_eq!(last.status, StepStatus::Failed);
    assert_eq!(last.node, "review");
    assert_eq!(last.state.text, "+");
    assert_eq!(
        last.state.error.as_deref(),
        Some("node execution failure at 'review': reviewer offline")
    );
    assert!(trace.clone().into_result().is_err());
}

#[tokio::test]
async fn test_snapshots_stream_in_step_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let compiled = write_review_graph(2, calls).compile().unwrap();

    let snapshots: Vec<_> = compiled.stream(Draft::default()).collect().await;

    let steps: Vec<usize> = snapshots.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    assert_eq!(snapshots[0].status, StepStatus::Started);
    assert!(snapshots[1..4].iter().all(|s| s.status == StepStatus::Running));
    assert_eq!(snapshots[4].status, StepStatus::Finished);
    // Earlier snapshots are unaffected by later merges
    assert_eq!(snapshots[1].state.text, "+");
    assert_eq!(snapshots[3].state.text, "++");
}

#[tokio::test]
async fn test_compiled_graph_is_reusable() {
    let calls = Arc::new(AtomicUsize::new(0));
    let compiled = write_review_graph(1, calls.clone()).compile().unwrap();

    let first = compiled.invoke(Draft::default()).await;
    let second = compiled.clone().invoke(Draft::default()).await;

    assert_eq!(first.final_state(), second.final_state());
    assert_ne!(
        first.final_snapshot().unwrap().run_id,
        second.final_snapshot().unwrap().run_id
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
