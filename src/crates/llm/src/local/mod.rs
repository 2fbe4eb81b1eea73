//! Local LLM provider implementations.
//!
//! Providers running on localhost or the local network. No API keys, and the
//! data never leaves the machine.

pub mod ollama;

pub use ollama::OllamaClient;
