//! OpenAI-compatible client implementation.
//!
//! Works with any server exposing `POST {base_url}/chat/completions`. JSON
//! requests are sent with `response_format: {"type": "json_object"}`.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiClient;
//! use llm::config::RemoteLlmConfig;
//! use llm::{ChatModel, ChatRequest, Message};
//!
//! let config = RemoteLlmConfig::from_env(
//!     "OPENAI_API_KEY",
//!     "https://api.openai.com/v1",
//!     "gpt-4o-mini",
//! )?;
//! let client = OpenAiClient::new(config)?;
//!
//! let request = ChatRequest::new(vec![Message::human("Hello!")]);
//! let response = client.chat(request).await?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::{endpoint, http_client, send_with_retry};
use async_trait::async_trait;
use reqwest::Client;
use selfrag_graph::error::Result as GraphResult;
use selfrag_graph::llm::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
use selfrag_graph::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    /// Probe `GET {base_url}/models` with the configured key.
    pub async fn check_health(&self) -> Result<bool> {
        let url = endpoint(&self.config.base_url, "models");
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await;
        match response {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn convert_message(msg: &Message) -> OpenAiMessage {
        OpenAiMessage {
            role: match msg.role {
                MessageRole::System => "system",
                MessageRole::Human => "user",
                MessageRole::Assistant => "assistant",
            }
            .to_string(),
            content: Some(msg.text().to_string()),
        }
    }

    fn build_request(&self, request: &ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.config.temperature,
            response_format: request.wants_json().then(|| OpenAiResponseFormat {
                kind: "json_object".to_string(),
            }),
            stream: false,
        }
    }

    fn convert_response(openai_resp: OpenAiResponse) -> Result<ChatResponse> {
        let choice = openai_resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let mut response = ChatResponse::new(Message::assistant(
            choice.message.content.unwrap_or_default(),
        ));
        response.usage = openai_resp
            .usage
            .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens));

        response.metadata.insert(
            "model".to_string(),
            serde_json::Value::String(openai_resp.model),
        );
        response.metadata.insert(
            "finish_reason".to_string(),
            serde_json::Value::String(choice.finish_reason.unwrap_or_default()),
        );
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let url = endpoint(&self.config.base_url, "chat/completions");
        let body = self.build_request(&request);
        tracing::debug!(
            "OpenAI chat: model={} messages={} json={}",
            body.model,
            body.messages.len(),
            body.response_format.is_some()
        );

        let req = self
            .client
            .post(&url)
            .json(&body)
            .header("Authorization", format!("Bearer {}", self.config.api_key));
        let response = send_with_retry("OpenAI", req, self.config.max_retries).await?;

        let openai_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(Self::convert_response(openai_resp)?)
    }

    async fn is_available(&self) -> GraphResult<bool> {
        Ok(self.check_health().await.unwrap_or(false))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new(RemoteLlmConfig::new(
            "test-key",
            "https://api.openai.com/v1",
            "gpt-4o-mini",
        ))
        .unwrap()
    }

    #[test]
    fn test_message_conversion_all_roles() {
        let sys = OpenAiClient::convert_message(&Message::system("You are helpful"));
        assert_eq!(sys.role, "system");
        assert_eq!(sys.content, Some("You are helpful".to_string()));
        assert_eq!(OpenAiClient::convert_message(&Message::human("Hello")).role, "user");
        assert_eq!(
            OpenAiClient::convert_message(&Message::assistant("Hi")).role,
            "assistant"
        );
    }

    #[test]
    fn test_json_request_sets_response_format() {
        let request = ChatRequest::new(vec![Message::human("grade this")])
            .with_temperature(0.0)
            .with_json_output();
        let body = serde_json::to_value(client().build_request(&request)).unwrap();

        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_response_conversion() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"needs_retrieval\": true}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 8, "total_tokens": 48}
        }"#;
        let response = OpenAiClient::convert_response(serde_json::from_str(raw).unwrap()).unwrap();

        assert_eq!(response.text(), "{\"needs_retrieval\": true}");
        assert_eq!(response.usage.unwrap().total_tokens, 48);
        assert_eq!(response.metadata["finish_reason"], "stop");
    }

    #[test]
    fn test_response_without_choices_is_invalid() {
        let raw = r#"{"model": "gpt-4o-mini", "choices": [], "usage": null}"#;
        let result = OpenAiClient::convert_response(serde_json::from_str(raw).unwrap());
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_model_name() {
        assert_eq!(client().model_name(), "gpt-4o-mini");
        assert_eq!(client().config().api_key, "test-key");
    }
}
