//! # selfrag
//!
//! Self-correcting retrieval-augmented question answering on top of
//! [`selfrag_graph`].
//!
//! A question flows through a cyclic graph that decides whether documents
//! are needed, retrieves and filters them, generates a cited answer, checks
//! the answer against the context, revises it, checks that it actually
//! answers the question, and rewrites the retrieval query when it does not.
//! Revisions and rewrites have fixed budgets ([`LoopLimits`]) and the engine
//! caps the total number of steps.
//!
//! ```rust,ignore
//! use selfrag::{RagConfig, SelfRagPipeline};
//!
//! let config = RagConfig::load(Some("selfrag.yaml".as_ref()))?;
//! let pipeline: SelfRagPipeline = config.build_pipeline()?;
//!
//! let trace = pipeline.ask("What sets the minimum reflux ratio?").await;
//! for snapshot in &trace {
//!     println!("Step {}: {}", snapshot.step, snapshot.node);
//! }
//! println!("{}", trace.final_state().map(|s| s.answer_str()).unwrap_or(""));
//! ```
//!
//! Every external call goes through a collaborator trait (see
//! [`collaborators`]), so tests can drive the state machine with scripted
//! implementations and no model.

pub mod collaborators;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod nodes;
pub mod pipeline;
pub mod prompts;
pub mod retrieval;
pub mod routing;
pub mod state;
pub mod structured;

pub use collaborators::{
    AnswerReviser, Collaborators, DirectGenerator, GroundedGenerator, LlmCollaborators,
    QueryRewriter, RelevanceJudge, RetrievalDecider, Retriever, SupportVerifier, UsefulnessJudge,
};
pub use config::{Provider, RagConfig};
pub use context::assemble_context;
pub use document::{Document, DocumentMetadata};
pub use error::{CollaboratorError, CollaboratorResult, ConfigError};
pub use pipeline::{build_graph, SelfRagPipeline};
pub use retrieval::KeywordRetriever;
pub use routing::LoopLimits;
pub use state::{RagState, RagUpdate, SupportVerdict, UsefulnessVerdict};
pub use structured::{SupportAssessment, UsefulnessAssessment};
