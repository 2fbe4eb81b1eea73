//! Chat model providers
//!
//! Concrete [`ChatModel`] implementations for the pipeline:
//!
//! - [`local::OllamaClient`]: a local Ollama server (default)
//! - [`remote::OpenAiClient`]: any OpenAI-compatible `/chat/completions` endpoint
//!
//! ```rust,ignore
//! use llm::local::OllamaClient;
//! use llm::config::LocalLlmConfig;
//! use llm::{ChatModel, ChatRequest, Message};
//!
//! let client = OllamaClient::new(LocalLlmConfig::new("http://localhost:11434", "llama3.2"))?;
//! let response = client.chat(ChatRequest::new(vec![Message::human("Hello!")])).await?;
//! println!("{}", response.text());
//! ```

pub mod config;
pub mod error;

#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "remote")]
pub mod remote;

pub use config::{LocalLlmConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};

pub use selfrag_graph::llm::{
    ChatConfig, ChatModel, ChatRequest, ChatResponse, ResponseFormat, UsageMetadata,
};
pub use selfrag_graph::{Message, MessageRole};

/// Build the shared HTTP client used by every provider
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::ConfigError(format!("failed to build HTTP client: {}", e)))
}

/// Join a base URL and an API path without doubling slashes
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Run `attempt` until it succeeds, fails permanently, or `max_retries`
/// retries are spent. Backoff grows linearly from 250ms.
pub(crate) async fn retry_transient<T, F, Fut>(max_retries: u32, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retries = 0u32;
    loop {
        match attempt().await {
            Err(e) if retries < max_retries && e.is_retryable() => {
                retries += 1;
                tracing::warn!("Request failed ({}), retry {}/{}", e, retries, max_retries);
                tokio::time::sleep(std::time::Duration::from_millis(250 * u64::from(retries))).await;
            }
            result => return result,
        }
    }
}

/// Send a request and return the response only if its status is a success
///
/// Transient transport errors and retryable statuses are retried up to
/// `max_retries` times.
pub(crate) async fn send_with_retry(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    max_retries: u32,
) -> Result<reqwest::Response> {
    retry_transient(max_retries, || async {
        let pending = request
            .try_clone()
            .ok_or_else(|| LlmError::ConfigError("request body is not cloneable".to_string()))?;
        let response = pending.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::from_status(provider, status, body))
    })
    .await
}
