//! Error types for the QA pipeline

use thiserror::Error;

/// Failure reported by a collaborator (model, retriever, parser)
///
/// Nodes return these boxed as [`NodeError`](selfrag_graph::NodeError); the
/// engine turns them into a failure snapshot.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The chat model call failed
    #[error("model call failed: {0}")]
    Model(#[from] selfrag_graph::GraphError),

    /// The model answered, but not in the expected shape
    #[error("{collaborator} returned malformed output: {detail}")]
    MalformedOutput {
        collaborator: &'static str,
        detail: String,
    },

    /// Document retrieval failed
    #[error("retrieval failed: {0}")]
    Retrieval(String),
}

impl CollaboratorError {
    pub fn malformed(collaborator: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedOutput {
            collaborator,
            detail: detail.into(),
        }
    }
}

/// Result type for collaborator calls
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// Errors from loading or validating [`RagConfig`](crate::RagConfig) and corpora
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {detail}")]
    Parse { path: String, detail: String },

    #[error("unsupported file extension for {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),

    #[error("invalid environment variable {key}: {detail}")]
    Env { key: String, detail: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("model provider setup failed: {0}")]
    Provider(#[from] llm::LlmError),

    #[error("pipeline construction failed: {0}")]
    Graph(#[from] selfrag_graph::GraphError),
}
