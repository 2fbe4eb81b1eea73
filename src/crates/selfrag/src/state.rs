//! Pipeline state
//!
//! [`RagState`] is the full record threaded through the graph and
//! [`RagUpdate`] is the partial record a node returns. Merging overlays only
//! the fields an update sets; `user_query` can never be changed by a node.

use crate::document::Document;
use selfrag_graph::{ExecutionFailure, GraphState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grounding verdict produced by `is_sup`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportVerdict {
    FullySupported,
    PartiallySupported,
    NoSupport,
}

impl SupportVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportVerdict::FullySupported => "fully_supported",
            SupportVerdict::PartiallySupported => "partially_supported",
            SupportVerdict::NoSupport => "no_support",
        }
    }
}

impl fmt::Display for SupportVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usefulness verdict produced by `is_use`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsefulnessVerdict {
    Useful,
    #[serde(alias = "not-useful")]
    NotUseful,
}

impl UsefulnessVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsefulnessVerdict::Useful => "useful",
            UsefulnessVerdict::NotUseful => "not_useful",
        }
    }
}

impl fmt::Display for UsefulnessVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the pipeline has accumulated for one question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagState {
    /// Original question
    pub user_query: String,
    /// Rewritten query, used for retrieval once set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_retrieval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<Document>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_docs: Option<Vec<Document>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issup: Option<SupportVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<String>>,
    /// Revision attempts since the last fresh answer
    #[serde(default)]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isuse: Option<UsefulnessVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_reason: Option<String>,
    /// Query rewrites so far
    #[serde(default)]
    pub rewrite_tries: u32,
    /// Set only on the terminal snapshot of a failed run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ExecutionFailure>,
}

impl RagState {
    /// Initial state for a question, counters at zero
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            ..Default::default()
        }
    }

    /// `retrieval_query` when set and non-blank, otherwise `user_query`
    pub fn query_for_retrieval(&self) -> &str {
        match self.retrieval_query.as_deref() {
            Some(q) if !q.trim().is_empty() => q,
            _ => &self.user_query,
        }
    }

    pub fn context_str(&self) -> &str {
        self.context.as_deref().unwrap_or("")
    }

    pub fn answer_str(&self) -> &str {
        self.answer.as_deref().unwrap_or("")
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Partial update returned by a node. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_retrieval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<Document>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_docs: Option<Vec<Document>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issup: Option<SupportVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isuse: Option<UsefulnessVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_tries: Option<u32>,
}

impl RagUpdate {
    /// The empty update
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl GraphState for RagState {
    type Update = RagUpdate;

    fn merge(&self, update: RagUpdate) -> Self {
        let current = self.clone();
        RagState {
            user_query: current.user_query,
            retrieval_query: update.retrieval_query.or(current.retrieval_query),
            needs_retrieval: update.needs_retrieval.or(current.needs_retrieval),
            docs: update.docs.or(current.docs),
            relevant_docs: update.relevant_docs.or(current.relevant_docs),
            context: update.context.or(current.context),
            answer: update.answer.or(current.answer),
            issup: update.issup.or(current.issup),
            evidence: update.evidence.or(current.evidence),
            retries: update.retries.unwrap_or(current.retries),
            isuse: update.isuse.or(current.isuse),
            use_reason: update.use_reason.or(current.use_reason),
            rewrite_tries: update.rewrite_tries.unwrap_or(current.rewrite_tries),
            failure: current.failure,
        }
    }

    fn fail(&self, failure: &ExecutionFailure) -> Self {
        RagState {
            answer: Some(format!(
                "The answer could not be completed: {}.",
                failure
            )),
            failure: Some(failure.clone()),
            ..self.clone()
        }
    }
}
