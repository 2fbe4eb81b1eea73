//! Model-backed collaborators
//!
//! One [`LlmCollaborators`] value serves every model-backed role over a single
//! shared [`ChatModel`]. Judges request JSON output and parse it with
//! [`parse_structured`]; free-text roles return the trimmed reply.

use super::{
    AnswerReviser, DirectGenerator, GroundedGenerator, QueryRewriter, RelevanceJudge,
    RetrievalDecider, SupportVerifier, UsefulnessJudge,
};
use crate::error::CollaboratorResult;
use crate::prompts;
use crate::structured::{
    parse_structured, RelevanceDecision, RetrievalDecision, RewriteDecision, SupportAssessment,
    UsefulnessAssessment,
};
use async_trait::async_trait;
use selfrag_graph::llm::{ChatModel, ChatRequest};
use selfrag_graph::Message;
use std::sync::Arc;

/// Default sampling temperature; judges should be deterministic
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

pub struct LlmCollaborators {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl LlmCollaborators {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    async fn complete(&self, messages: Vec<Message>, json: bool) -> CollaboratorResult<String> {
        let mut request = ChatRequest::new(messages).with_temperature(self.temperature);
        if json {
            request = request.with_json_output();
        }
        let response = self.model.chat(request).await?;
        tracing::debug!(
            "Model {} replied with {} chars",
            self.model.model_name(),
            response.text().len()
        );
        Ok(response.text().to_string())
    }
}

#[async_trait]
impl RetrievalDecider for LlmCollaborators {
    async fn should_retrieve(&self, query: &str) -> CollaboratorResult<bool> {
        let reply = self.complete(prompts::decide_retrieval(query.trim()), true).await?;
        let decision: RetrievalDecision = parse_structured("retrieval decider", &reply)?;
        Ok(decision.should_retrieve)
    }
}

#[async_trait]
impl DirectGenerator for LlmCollaborators {
    async fn generate(&self, query: &str) -> CollaboratorResult<String> {
        let reply = self.complete(prompts::direct_answer(query), false).await?;
        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl RelevanceJudge for LlmCollaborators {
    async fn is_relevant(&self, document: &str, query: &str) -> CollaboratorResult<bool> {
        let reply = self.complete(prompts::judge_relevance(document, query), true).await?;
        let decision: RelevanceDecision = parse_structured("relevance judge", &reply)?;
        Ok(decision.is_relevant)
    }
}

#[async_trait]
impl GroundedGenerator for LlmCollaborators {
    async fn generate(&self, query: &str, context: &str) -> CollaboratorResult<String> {
        self.complete(prompts::grounded_answer(query, context), false).await
    }
}

#[async_trait]
impl SupportVerifier for LlmCollaborators {
    async fn verify(
        &self,
        query: &str,
        context: &str,
        answer: &str,
    ) -> CollaboratorResult<SupportAssessment> {
        let reply = self
            .complete(prompts::verify_support(query, context, answer), true)
            .await?;
        parse_structured("grounding verifier", &reply)
    }
}

#[async_trait]
impl AnswerReviser for LlmCollaborators {
    async fn revise(&self, query: &str, context: &str, answer: &str) -> CollaboratorResult<String> {
        let reply = self
            .complete(prompts::revise_answer(query, context, answer), false)
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl UsefulnessJudge for LlmCollaborators {
    async fn judge(&self, question: &str, answer: &str) -> CollaboratorResult<UsefulnessAssessment> {
        let reply = self
            .complete(prompts::judge_usefulness(question, answer), true)
            .await?;
        parse_structured("usefulness judge", &reply)
    }
}

#[async_trait]
impl QueryRewriter for LlmCollaborators {
    async fn rewrite(
        &self,
        question: &str,
        previous_query: &str,
        previous_answer: &str,
    ) -> CollaboratorResult<String> {
        if question.trim().is_empty() {
            return Ok(String::new());
        }
        let reply = self
            .complete(
                prompts::rewrite_query(question, previous_query, previous_answer),
                true,
            )
            .await?;
        let decision: RewriteDecision = parse_structured("query rewriter", &reply)?;
        Ok(decision.retrieval_query.trim().to_string())
    }
}
