//! External collaborators
//!
//! Each node delegates its one external call to a collaborator trait object.
//! Collaborators either return a value or fail; they never return partial
//! results. Implementations handle their own timeouts and retries.
//!
//! | Trait | Used by |
//! |---|---|
//! | [`RetrievalDecider`] | `decide_retrieval` |
//! | [`DirectGenerator`] | `generate_direct` |
//! | [`Retriever`] | `retrieve` |
//! | [`RelevanceJudge`] | `is_relevant` (once per document) |
//! | [`GroundedGenerator`] | `generate_from_context` |
//! | [`SupportVerifier`] | `is_sup` |
//! | [`AnswerReviser`] | `revise_answer` |
//! | [`UsefulnessJudge`] | `is_use` |
//! | [`QueryRewriter`] | `rewrite_question` |

pub mod llm;

pub use self::llm::LlmCollaborators;

use crate::document::Document;
use crate::error::CollaboratorResult;
use crate::structured::{SupportAssessment, UsefulnessAssessment};
use async_trait::async_trait;
use selfrag_graph::llm::ChatModel;
use std::sync::Arc;

#[async_trait]
pub trait RetrievalDecider: Send + Sync {
    /// Whether answering `query` needs external documents
    async fn should_retrieve(&self, query: &str) -> CollaboratorResult<bool>;
}

#[async_trait]
pub trait DirectGenerator: Send + Sync {
    /// Answer without any retrieved context
    async fn generate(&self, query: &str) -> CollaboratorResult<String>;
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Candidate documents for `query`, best first
    async fn retrieve(&self, query: &str) -> CollaboratorResult<Vec<Document>>;
}

#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn is_relevant(&self, document: &str, query: &str) -> CollaboratorResult<bool>;
}

#[async_trait]
pub trait GroundedGenerator: Send + Sync {
    /// Answer `query` using only `context`
    async fn generate(&self, query: &str, context: &str) -> CollaboratorResult<String>;
}

#[async_trait]
pub trait SupportVerifier: Send + Sync {
    /// Never called with an empty context
    async fn verify(
        &self,
        query: &str,
        context: &str,
        answer: &str,
    ) -> CollaboratorResult<SupportAssessment>;
}

#[async_trait]
pub trait AnswerReviser: Send + Sync {
    /// Never called with an empty context
    async fn revise(&self, query: &str, context: &str, answer: &str) -> CollaboratorResult<String>;
}

#[async_trait]
pub trait UsefulnessJudge: Send + Sync {
    async fn judge(&self, question: &str, answer: &str) -> CollaboratorResult<UsefulnessAssessment>;
}

#[async_trait]
pub trait QueryRewriter: Send + Sync {
    /// A new retrieval query given what was tried before
    async fn rewrite(
        &self,
        question: &str,
        previous_query: &str,
        previous_answer: &str,
    ) -> CollaboratorResult<String>;
}

/// One handle per collaborator role
#[derive(Clone)]
pub struct Collaborators {
    pub decider: Arc<dyn RetrievalDecider>,
    pub direct: Arc<dyn DirectGenerator>,
    pub retriever: Arc<dyn Retriever>,
    pub relevance: Arc<dyn RelevanceJudge>,
    pub generator: Arc<dyn GroundedGenerator>,
    pub verifier: Arc<dyn SupportVerifier>,
    pub reviser: Arc<dyn AnswerReviser>,
    pub usefulness: Arc<dyn UsefulnessJudge>,
    pub rewriter: Arc<dyn QueryRewriter>,
}

impl Collaborators {
    /// Every model-backed role served by one chat model
    pub fn from_model(model: Arc<dyn ChatModel>, retriever: Arc<dyn Retriever>) -> Self {
        Self::from_llm(Arc::new(LlmCollaborators::new(model)), retriever)
    }

    pub fn from_llm(llm: Arc<LlmCollaborators>, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            decider: llm.clone(),
            direct: llm.clone(),
            retriever,
            relevance: llm.clone(),
            generator: llm.clone(),
            verifier: llm.clone(),
            reviser: llm.clone(),
            usefulness: llm.clone(),
            rewriter: llm,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
