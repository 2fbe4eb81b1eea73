//! Request configuration for chat models

use crate::messages::Message;
use serde::{Deserialize, Serialize};

/// A chat request: the conversation plus sampling settings
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,

    pub config: ChatConfig,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Ask the provider to constrain output to a JSON object
    pub fn with_json_output(mut self) -> Self {
        self.config.response_format = ResponseFormat::Json;
        self
    }

    pub fn wants_json(&self) -> bool {
        self.config.response_format == ResponseFormat::Json
    }
}

/// Sampling settings; `None` leaves the provider default
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    pub temperature: Option<f32>,
    pub response_format: ResponseFormat,
}

/// Output shape requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Text,
    /// A single JSON object
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_builder() {
        let request = ChatRequest::new(vec![Message::human("test")])
            .with_temperature(0.7)
            .with_json_output();

        assert_eq!(request.config.temperature, Some(0.7));
        assert!(request.wants_json());
    }

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.response_format, ResponseFormat::Text);
        assert!(config.temperature.is_none());
    }
}
