//! Structured model output
//!
//! Judges and the rewriter answer with a single JSON object. Models often wrap
//! it in a ```json fence or surround it with prose, so the object is located
//! first and then deserialized strictly: missing fields and unknown enum tags
//! are errors, never defaults.

use crate::error::{CollaboratorError, CollaboratorResult};
use crate::state::{SupportVerdict, UsefulnessVerdict};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Output of the retrieval-decision collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalDecision {
    pub should_retrieve: bool,
}

/// Output of the relevance judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceDecision {
    pub is_relevant: bool,
}

/// Output of the grounding verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportAssessment {
    pub issup: SupportVerdict,
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl SupportAssessment {
    pub fn no_support() -> Self {
        Self {
            issup: SupportVerdict::NoSupport,
            evidence: Vec::new(),
        }
    }
}

/// Output of the usefulness judge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsefulnessAssessment {
    pub isuse: UsefulnessVerdict,
    pub reason: String,
}

/// Output of the query rewriter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteDecision {
    pub retrieval_query: String,
}

/// Locate the JSON object in a model reply
pub fn extract_json(text: &str) -> Option<&str> {
    for fence in ["```json", "```JSON"] {
        if let Some(start) = text.find(fence) {
            let content = &text[start + fence.len()..];
            if let Some(end) = content.find("```") {
                return Some(content[..end].trim());
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].trim())
}

/// Parse a model reply into `T`
pub fn parse_structured<T: DeserializeOwned>(
    collaborator: &'static str,
    text: &str,
) -> CollaboratorResult<T> {
    let json = extract_json(text).ok_or_else(|| {
        CollaboratorError::malformed(collaborator, format!("no JSON object in reply: {}", preview(text)))
    })?;
    serde_json::from_str(json).map_err(|e| CollaboratorError::malformed(collaborator, e.to_string()))
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX).collect();
        format!("{}...", head)
    }
}
