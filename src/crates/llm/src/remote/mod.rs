//! Remote LLM provider implementations.
//!
//! Cloud-hosted or self-hosted APIs that speak the OpenAI chat-completions
//! protocol (OpenAI itself, vLLM, LM Studio, OpenRouter, ...).

pub mod openai;

pub use openai::OpenAiClient;
