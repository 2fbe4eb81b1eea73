//! The self-correcting QA pipeline
//!
//! ```text
//! decide_retrieval ─┬─▶ generate_direct ──────────────────────────────▶ END
//!                   └─▶ retrieve ─▶ is_relevant ─┬─▶ no_relevant_docs ──▶ END
//!                          ▲                     └─▶ generate_from_context
//!                          │                                │
//!                          │        ┌── revise_answer ◀──┐  ▼
//!                          │        └───────────────────▶ is_sup ─▶ is_use ─▶ finalize ─▶ END
//!                          │                               │         │
//!                          └──────── rewrite_question ◀────┴─────────┤
//!                                                          │         │
//!                                        best_effort ◀─────┴─────────┘ ─▶ END
//! ```
//!
//! `is_sup` and `is_use` hand over to `best_effort` instead of
//! `rewrite_question` once the rewrite budget is spent, so a run can never
//! re-enter `retrieve` with an unchanged query.

use crate::collaborators::Collaborators;
use crate::nodes::{
    BestEffort, DecideRetrieval, Finalize, GenerateDirect, GenerateFromContext, IsRelevant,
    IsSup, IsUse, NoRelevantDocs, Retrieve, ReviseAnswer, RewriteQuestion,
};
use crate::routing::{
    route_after_decide, route_after_relevance, LoopLimits, BEST_EFFORT, DECIDE_BRANCHES,
    DECIDE_RETRIEVAL, FINALIZE, GENERATE_DIRECT, GENERATE_FROM_CONTEXT, ISSUP_BRANCHES,
    ISUSE_BRANCHES, IS_RELEVANT, IS_SUP, IS_USE, NO_RELEVANT_DOCS, RELEVANCE_BRANCHES, RETRIEVE,
    REVISE_ANSWER, REWRITE_QUESTION,
};
use crate::state::RagState;
use selfrag_graph::{
    CompiledGraph, ExecutionConfig, Result, SnapshotStream, StateGraph, Trace,
    VisualizationOptions,
};

/// Wire the twelve nodes and four routers into a compiled graph
pub fn build_graph(
    collaborators: &Collaborators,
    limits: LoopLimits,
    config: ExecutionConfig,
) -> Result<CompiledGraph<RagState>> {
    let mut graph = StateGraph::<RagState>::new();

    graph
        .add_node(DECIDE_RETRIEVAL, DecideRetrieval::new(collaborators.decider.clone()))
        .add_node(GENERATE_DIRECT, GenerateDirect::new(collaborators.direct.clone()))
        .add_node(RETRIEVE, Retrieve::new(collaborators.retriever.clone()))
        .add_node(IS_RELEVANT, IsRelevant::new(collaborators.relevance.clone()))
        .add_node(NO_RELEVANT_DOCS, NoRelevantDocs)
        .add_node(
            GENERATE_FROM_CONTEXT,
            GenerateFromContext::new(collaborators.generator.clone()),
        )
        .add_node(IS_SUP, IsSup::new(collaborators.verifier.clone()))
        .add_node(REVISE_ANSWER, ReviseAnswer::new(collaborators.reviser.clone()))
        .add_node(IS_USE, IsUse::new(collaborators.usefulness.clone()))
        .add_node(
            REWRITE_QUESTION,
            RewriteQuestion::new(collaborators.rewriter.clone(), limits.max_rewrites),
        )
        .add_node(FINALIZE, Finalize)
        .add_node(BEST_EFFORT, BestEffort);

    graph.set_entry(DECIDE_RETRIEVAL);

    graph
        .add_conditional_edge(DECIDE_RETRIEVAL, route_after_decide, DECIDE_BRANCHES)
        .add_finish(GENERATE_DIRECT)
        .add_edge(RETRIEVE, IS_RELEVANT)
        .add_conditional_edge(IS_RELEVANT, route_after_relevance, RELEVANCE_BRANCHES)
        .add_finish(NO_RELEVANT_DOCS)
        .add_edge(GENERATE_FROM_CONTEXT, IS_SUP)
        .add_conditional_edge(
            IS_SUP,
            move |state: &RagState| limits.route_after_issup(state),
            ISSUP_BRANCHES,
        )
        .add_edge(REVISE_ANSWER, IS_SUP)
        .add_conditional_edge(
            IS_USE,
            move |state: &RagState| limits.route_after_isuse(state),
            ISUSE_BRANCHES,
        )
        .add_edge(REWRITE_QUESTION, RETRIEVE)
        .add_finish(FINALIZE)
        .add_finish(BEST_EFFORT);

    graph.compile_with_config(config)
}

/// A ready-to-run QA pipeline
#[derive(Clone, Debug)]
pub struct SelfRagPipeline {
    graph: CompiledGraph<RagState>,
    limits: LoopLimits,
}

impl SelfRagPipeline {
    pub fn new(
        collaborators: Collaborators,
        limits: LoopLimits,
        config: ExecutionConfig,
    ) -> Result<Self> {
        let graph = build_graph(&collaborators, limits, config)?;
        Ok(Self { graph, limits })
    }

    /// Pipeline with default loop limits and a step cap that covers them
    pub fn with_defaults(collaborators: Collaborators) -> Result<Self> {
        let limits = LoopLimits::default();
        Self::new(
            collaborators,
            limits,
            ExecutionConfig::new(limits.worst_case_steps()),
        )
    }

    pub fn limits(&self) -> LoopLimits {
        self.limits
    }

    pub fn graph(&self) -> &CompiledGraph<RagState> {
        &self.graph
    }

    /// Snapshots for `question`, emitted as each node completes
    pub fn stream(&self, question: impl Into<String>) -> SnapshotStream<RagState> {
        self.graph.stream(RagState::new(question))
    }

    /// Run `question` to completion and return the full trace
    pub async fn ask(&self, question: impl Into<String>) -> Trace<RagState> {
        self.graph.invoke(RagState::new(question)).await
    }

    /// Run `question` and return only the final answer
    pub async fn answer(&self, question: impl Into<String>) -> String {
        self.ask(question)
            .await
            .final_state()
            .map(|state| state.answer_str().to_string())
            .unwrap_or_default()
    }

    pub fn visualize(&self, options: &VisualizationOptions) -> String {
        self.graph.visualize(options)
    }
}
