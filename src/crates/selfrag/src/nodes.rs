//! The twelve nodes of the QA loop
//!
//! Each node holds the one collaborator it calls (if any), reads the state,
//! and returns a [`RagUpdate`]. Collaborator errors propagate as the node's
//! error and end the run with a failure snapshot.

use crate::collaborators::{
    AnswerReviser, DirectGenerator, GroundedGenerator, QueryRewriter, RelevanceJudge,
    RetrievalDecider, Retriever, SupportVerifier, UsefulnessJudge,
};
use crate::context::assemble_context;
use crate::state::{RagState, RagUpdate, UsefulnessVerdict};
use crate::structured::SupportAssessment;
use async_trait::async_trait;
use selfrag_graph::{Node, NodeError};
use std::sync::Arc;

/// Answer used when no retrieved document survives the relevance filter
pub const NO_RELEVANT_DOCS_ANSWER: &str = "No relevant documents found.";
/// Answer used when the question is blank
pub const EMPTY_QUESTION_ANSWER: &str = "No question was provided.";
/// Reason recorded when the usefulness judge is skipped for a blank answer
pub const NO_ANSWER_REASON: &str = "No answer provided.";

pub struct DecideRetrieval {
    decider: Arc<dyn RetrievalDecider>,
}

impl DecideRetrieval {
    pub fn new(decider: Arc<dyn RetrievalDecider>) -> Self {
        Self { decider }
    }
}

#[async_trait]
impl Node<RagState> for DecideRetrieval {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        if state.user_query.trim().is_empty() {
            tracing::debug!("Blank question, skipping retrieval");
            return Ok(RagUpdate {
                needs_retrieval: Some(false),
                ..Default::default()
            });
        }

        let needs = self.decider.should_retrieve(state.query_for_retrieval()).await?;
        tracing::debug!("Retrieval needed: {}", needs);
        Ok(RagUpdate {
            needs_retrieval: Some(needs),
            ..Default::default()
        })
    }
}

pub struct GenerateDirect {
    generator: Arc<dyn DirectGenerator>,
}

impl GenerateDirect {
    pub fn new(generator: Arc<dyn DirectGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Node<RagState> for GenerateDirect {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        let answer = if state.user_query.trim().is_empty() {
            EMPTY_QUESTION_ANSWER.to_string()
        } else {
            self.generator.generate(&state.user_query).await?
        };
        Ok(RagUpdate {
            answer: Some(answer),
            ..Default::default()
        })
    }
}

pub struct Retrieve {
    retriever: Arc<dyn Retriever>,
}

impl Retrieve {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Node<RagState> for Retrieve {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        let query = state.query_for_retrieval();
        let docs = self.retriever.retrieve(query).await?;
        tracing::debug!("Retrieved {} candidates for {:?}", docs.len(), query);
        Ok(RagUpdate {
            docs: Some(docs),
            ..Default::default()
        })
    }
}

/// Keeps the candidates the judge accepts, in retrieval order
pub struct IsRelevant {
    judge: Arc<dyn RelevanceJudge>,
}

impl IsRelevant {
    pub fn new(judge: Arc<dyn RelevanceJudge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Node<RagState> for IsRelevant {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        let candidates = state.docs.as_deref().unwrap_or_default();
        let mut relevant = Vec::with_capacity(candidates.len());
        for doc in candidates {
            if self.judge.is_relevant(&doc.content, &state.user_query).await? {
                relevant.push(doc.clone());
            }
        }
        tracing::debug!("{} of {} documents relevant", relevant.len(), candidates.len());
        Ok(RagUpdate {
            relevant_docs: Some(relevant),
            ..Default::default()
        })
    }
}

pub struct NoRelevantDocs;

#[async_trait]
impl Node<RagState> for NoRelevantDocs {
    async fn execute(&self, _state: &RagState) -> Result<RagUpdate, NodeError> {
        Ok(RagUpdate {
            answer: Some(NO_RELEVANT_DOCS_ANSWER.to_string()),
            context: Some(String::new()),
            ..Default::default()
        })
    }
}

/// Assembles the context and produces a fresh answer; resets `retries`
pub struct GenerateFromContext {
    generator: Arc<dyn GroundedGenerator>,
}

impl GenerateFromContext {
    pub fn new(generator: Arc<dyn GroundedGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Node<RagState> for GenerateFromContext {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        let context = assemble_context(state.relevant_docs.as_deref().unwrap_or_default());
        tracing::debug!("Generating from {} chars of context", context.len());
        let answer = self.generator.generate(&state.user_query, &context).await?;
        Ok(RagUpdate {
            context: Some(context),
            answer: Some(answer),
            retries: Some(0),
            ..Default::default()
        })
    }
}

pub struct IsSup {
    verifier: Arc<dyn SupportVerifier>,
}

impl IsSup {
    pub fn new(verifier: Arc<dyn SupportVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl Node<RagState> for IsSup {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        let context = state.context_str();
        let assessment = if context.trim().is_empty() {
            SupportAssessment::no_support()
        } else {
            self.verifier
                .verify(&state.user_query, context, state.answer_str())
                .await?
        };
        tracing::debug!(
            "Support verdict {} with {} quotes",
            assessment.issup,
            assessment.evidence.len()
        );
        Ok(RagUpdate {
            issup: Some(assessment.issup),
            evidence: Some(assessment.evidence),
            ..Default::default()
        })
    }
}

/// Rewrites the answer against the context; always counts one retry
pub struct ReviseAnswer {
    reviser: Arc<dyn AnswerReviser>,
}

impl ReviseAnswer {
    pub fn new(reviser: Arc<dyn AnswerReviser>) -> Self {
        Self { reviser }
    }
}

#[async_trait]
impl Node<RagState> for ReviseAnswer {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        let context = state.context_str();
        let answer = if context.trim().is_empty() {
            state.answer_str().to_string()
        } else {
            self.reviser
                .revise(&state.user_query, context, state.answer_str())
                .await?
        };
        Ok(RagUpdate {
            answer: Some(answer),
            retries: Some(state.retries.saturating_add(1)),
            ..Default::default()
        })
    }
}

pub struct IsUse {
    judge: Arc<dyn UsefulnessJudge>,
}

impl IsUse {
    pub fn new(judge: Arc<dyn UsefulnessJudge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Node<RagState> for IsUse {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        let answer = state.answer_str();
        if answer.trim().is_empty() {
            return Ok(RagUpdate {
                isuse: Some(UsefulnessVerdict::NotUseful),
                use_reason: Some(NO_ANSWER_REASON.to_string()),
                ..Default::default()
            });
        }

        let assessment = self.judge.judge(&state.user_query, answer).await?;
        tracing::debug!("Usefulness verdict {}", assessment.isuse);
        Ok(RagUpdate {
            isuse: Some(assessment.isuse),
            use_reason: Some(assessment.reason),
            ..Default::default()
        })
    }
}

/// Asks for a new retrieval query until the rewrite budget is spent
pub struct RewriteQuestion {
    rewriter: Arc<dyn QueryRewriter>,
    max_rewrites: u32,
}

impl RewriteQuestion {
    pub fn new(rewriter: Arc<dyn QueryRewriter>, max_rewrites: u32) -> Self {
        Self {
            rewriter,
            max_rewrites,
        }
    }
}

#[async_trait]
impl Node<RagState> for RewriteQuestion {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        if state.rewrite_tries >= self.max_rewrites {
            tracing::debug!("Rewrite budget of {} spent", self.max_rewrites);
            return Ok(RagUpdate::none());
        }

        let query = self
            .rewriter
            .rewrite(
                &state.user_query,
                state.query_for_retrieval(),
                state.answer_str(),
            )
            .await?;
        tracing::info!("Rewrote retrieval query to {:?}", query);
        Ok(RagUpdate {
            retrieval_query: Some(query),
            rewrite_tries: Some(state.rewrite_tries + 1),
            ..Default::default()
        })
    }
}

pub struct Finalize;

#[async_trait]
impl Node<RagState> for Finalize {
    async fn execute(&self, _state: &RagState) -> Result<RagUpdate, NodeError> {
        Ok(RagUpdate::none())
    }
}

/// Terminal node reached when the rewrite budget is exhausted; keeps the
/// current answer
pub struct BestEffort;

#[async_trait]
impl Node<RagState> for BestEffort {
    async fn execute(&self, state: &RagState) -> Result<RagUpdate, NodeError> {
        tracing::info!(
            "Rewrite budget exhausted after {} tries, returning best effort answer",
            state.rewrite_tries
        );
        Ok(RagUpdate::none())
    }
}
