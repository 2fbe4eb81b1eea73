use crate::error::Result;
use crate::llm::config::ChatRequest;
use crate::llm::response::ChatResponse;
use async_trait::async_trait;

/// Core trait for chat-based language models.
///
/// Implementations convert messages to their provider's wire format, make the
/// call, and parse the reply. They must be `Send + Sync`; share them across
/// nodes as `Arc<dyn ChatModel>`.
///
/// Provider failures should be reported as [`GraphError::Model`](crate::GraphError::Model).
///
/// # Example
///
/// ```rust,ignore
/// let request = ChatRequest::new(vec![Message::human("What is 2 + 2?")])
///     .with_temperature(0.0);
///
/// let response = model.chat(request).await?;
/// println!("Answer: {}", response.text());
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete chat response from messages.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Check if the model/provider is reachable.
    ///
    /// Default implementation returns `Ok(true)`.
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    /// Model identifier, used in logs.
    fn model_name(&self) -> &str {
        "unknown"
    }
}
