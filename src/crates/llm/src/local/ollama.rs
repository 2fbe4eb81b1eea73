//! Ollama client implementation.
//!
//! Talks to the `/api/chat` endpoint of a local Ollama server. Requests that
//! ask for JSON output are sent with `"format": "json"`, which makes Ollama
//! constrain sampling to a valid JSON document.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::local::OllamaClient;
//! use llm::config::LocalLlmConfig;
//! use llm::{ChatModel, ChatRequest, Message};
//!
//! let config = LocalLlmConfig::new("http://localhost:11434", "llama3.2");
//! let client = OllamaClient::new(config)?;
//!
//! let request = ChatRequest::new(vec![Message::human("Hello!")]);
//! let response = client.chat(request).await?;
//! ```

use crate::config::LocalLlmConfig;
use crate::error::{LlmError, Result};
use crate::{endpoint, http_client, send_with_retry};
use async_trait::async_trait;
use reqwest::Client;
use selfrag_graph::error::Result as GraphResult;
use selfrag_graph::llm::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
use selfrag_graph::{Message, MessageRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ollama client for local LLM inference.
#[derive(Clone)]
pub struct OllamaClient {
    config: LocalLlmConfig,
    client: Client,
}

impl OllamaClient {
    /// Create a new Ollama client with the given configuration.
    pub fn new(config: LocalLlmConfig) -> Result<Self> {
        let client = http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LocalLlmConfig {
        &self.config
    }

    /// Check if the Ollama server is running.
    pub async fn check_health(&self) -> Result<bool> {
        let url = endpoint(&self.config.base_url, "api/tags");
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn convert_message(msg: &Message) -> OllamaMessage {
        OllamaMessage {
            role: match msg.role {
                MessageRole::System => "system",
                MessageRole::Human => "user",
                MessageRole::Assistant => "assistant",
            }
            .to_string(),
            content: msg.text().to_string(),
        }
    }

    fn build_request(&self, request: &ChatRequest) -> OllamaRequest {
        let mut options = HashMap::new();
        if let Some(temp) = request.config.temperature {
            options.insert("temperature", serde_json::Value::from(temp));
        }

        OllamaRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            stream: false,
            format: request.wants_json().then(|| "json".to_string()),
            options: if options.is_empty() { None } else { Some(options) },
        }
    }

    fn convert_response(ollama_resp: OllamaResponse) -> ChatResponse {
        let mut response = ChatResponse::new(Message::assistant(ollama_resp.message.content));

        if ollama_resp.prompt_eval_count.is_some() || ollama_resp.eval_count.is_some() {
            response.usage = Some(UsageMetadata::new(
                ollama_resp.prompt_eval_count.unwrap_or(0),
                ollama_resp.eval_count.unwrap_or(0),
            ));
        }

        response.metadata.insert(
            "model".to_string(),
            serde_json::Value::String(ollama_resp.model),
        );
        if let Some(total_duration) = ollama_resp.total_duration {
            response.metadata.insert(
                "total_duration_ns".to_string(),
                serde_json::Value::Number(total_duration.into()),
            );
        }
        response
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let url = endpoint(&self.config.base_url, "api/chat");
        let body = self.build_request(&request);
        tracing::debug!(
            "Ollama chat: model={} messages={} json={}",
            body.model,
            body.messages.len(),
            body.format.is_some()
        );

        let request = self.client.post(&url).json(&body);
        let response = send_with_retry("Ollama", request, self.config.max_retries).await?;

        let ollama_resp: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(Self::convert_response(ollama_resp))
    }

    async fn is_available(&self) -> GraphResult<bool> {
        Ok(self.check_health().await.unwrap_or(false))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<HashMap<&'static str, serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    total_duration: Option<u64>,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
    #[serde(default)]
    eval_count: Option<usize>,
}
