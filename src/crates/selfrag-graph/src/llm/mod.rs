//! Provider-agnostic chat model interface
//!
//! Nodes that need a language model depend on [`ChatModel`] only; concrete
//! clients (Ollama, OpenAI-compatible servers) live in the `llm` crate.

pub mod config;
pub mod response;
pub mod traits;

pub use config::{ChatConfig, ChatRequest, ResponseFormat};
pub use response::{ChatResponse, UsageMetadata};
pub use traits::ChatModel;
