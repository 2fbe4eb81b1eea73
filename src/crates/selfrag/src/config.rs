//! Pipeline configuration
//!
//! Loaded from YAML or JSON (chosen by file extension); every section and
//! field has a default, so an empty file is a valid configuration:
//!
//! ```yaml
//! llm:
//!   provider: ollama            # or: openai
//!   base_url: http://localhost:11434
//!   model: llama3.2
//!   temperature: 0.0
//!   timeout_secs: 120
//!   max_retries: 2
//! retrieval:
//!   corpus_path: ./corpus.yaml
//!   top_k: 5
//! limits:
//!   max_revisions: 2
//!   max_rewrites: 2
//!   max_steps: 64
//! ```
//!
//! Environment variables `SELFRAG_PROVIDER`, `SELFRAG_BASE_URL`,
//! `SELFRAG_MODEL`, `SELFRAG_CORPUS` and `SELFRAG_MAX_STEPS` override the
//! file.

use crate::collaborators::{Collaborators, LlmCollaborators, Retriever};
use crate::error::ConfigError;
use crate::pipeline::SelfRagPipeline;
use crate::retrieval::{KeywordRetriever, DEFAULT_TOP_K};
use crate::routing::LoopLimits;
use llm::local::OllamaClient;
use llm::remote::OpenAiClient;
use llm::config::DEFAULT_MAX_RETRIES;
use llm::{LocalLlmConfig, RemoteLlmConfig};
use selfrag_graph::llm::ChatModel;
use selfrag_graph::ExecutionConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const ENV_PROVIDER: &str = "SELFRAG_PROVIDER";
pub const ENV_BASE_URL: &str = "SELFRAG_BASE_URL";
pub const ENV_MODEL: &str = "SELFRAG_MODEL";
pub const ENV_CORPUS: &str = "SELFRAG_CORPUS";
pub const ENV_MAX_STEPS: &str = "SELFRAG_MAX_STEPS";

/// Parse a `.yaml`, `.yml` or `.json` file
pub(crate) fn read_structured_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let yaml = match extension.as_str() {
        "yaml" | "yml" => true,
        "json" => false,
        _ => return Err(ConfigError::UnsupportedFormat(display)),
    };

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    let parsed = if yaml {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|detail| ConfigError::Parse {
        path: display,
        detail,
    })
}

/// Chat model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Ollama => f.write_str("ollama"),
            Provider::OpenAi => f.write_str("openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" | "openai-compatible" => Ok(Provider::OpenAi),
            other => Err(format!("unknown provider '{}' (expected ollama or openai)", other)),
        }
    }
}

/// Chat model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Provider,
    /// Defaults to the provider's usual endpoint
    pub base_url: Option<String>,
    pub model: String,
    /// Environment variable holding the API key (openai only)
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Retries for transient provider failures
    pub max_retries: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            base_url: None,
            model: "llama3.2".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl LlmSection {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Document corpus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    pub corpus_path: Option<PathBuf>,
    pub top_k: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            corpus_path: None,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Retry budgets and the engine step cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_revisions: u32,
    pub max_rewrites: u32,
    pub max_steps: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        let loops = LoopLimits::default();
        Self {
            max_revisions: loops.max_revisions,
            max_rewrites: loops.max_rewrites,
            max_steps: 64,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retrieval: RetrievalSection,
    #[serde(default)]
    pub limits: LimitsSection,
}

impl RagConfig {
    /// Read a configuration file without applying environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_structured_file(path.as_ref())
    }

    /// Defaults or `path`, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SELFRAG_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PROVIDER) {
            self.llm.provider = value.parse::<Provider>().map_err(|detail| ConfigError::Env {
                key: ENV_PROVIDER.to_string(),
                detail,
            })?;
        }
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = lookup(ENV_MODEL) {
            self.llm.model = value;
        }
        if let Some(value) = lookup(ENV_CORPUS) {
            self.retrieval.corpus_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_MAX_STEPS) {
            self.limits.max_steps = value.trim().parse::<usize>().map_err(|e| ConfigError::Env {
                key: ENV_MAX_STEPS.to_string(),
                detail: format!("{}", e),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        if self.llm.base_url().trim().is_empty() {
            return Err(ConfigError::Invalid("llm.base_url must not be empty".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be at least 1".to_string()));
        }

        let needed = self.loop_limits().worst_case_steps();
        if self.limits.max_steps < needed {
            return Err(ConfigError::Invalid(format!(
                "limits.max_steps is {} but {} revisions and {} rewrites can take {} steps",
                self.limits.max_steps, self.limits.max_revisions, self.limits.max_rewrites, needed
            )));
        }
        Ok(())
    }

    pub fn loop_limits(&self) -> LoopLimits {
        LoopLimits::new(self.limits.max_revisions, self.limits.max_rewrites)
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig::new(self.limits.max_steps)
    }

    /// Chat model client for the configured provider
    pub fn build_model(&self) -> Result<Arc<dyn ChatModel>, ConfigError> {
        let timeout = Duration::from_secs(self.llm.timeout_secs);
        let model: Arc<dyn ChatModel> = match self.llm.provider {
            Provider::Ollama => {
                let config = LocalLlmConfig::new(self.llm.base_url(), self.llm.model.as_str())
                    .with_timeout(timeout)
                    .with_max_retries(self.llm.max_retries);
                Arc::new(OllamaClient::new(config)?)
            }
            Provider::OpenAi => {
                let config = RemoteLlmConfig::from_env(
                    &self.llm.api_key_env,
                    self.llm.base_url(),
                    self.llm.model.as_str(),
                )?
                .with_timeout(timeout)
                .with_max_retries(self.llm.max_retries);
                Arc::new(OpenAiClient::new(config)?)
            }
        };
        tracing::info!(
            "Using {} model '{}' at {}",
            self.llm.provider,
            self.llm.model,
            self.llm.base_url()
        );
        Ok(model)
    }

    /// Keyword retriever over the configured corpus; empty without one
    pub fn build_retriever(&self) -> Result<KeywordRetriever, ConfigError> {
        match &self.retrieval.corpus_path {
            Some(path) => KeywordRetriever::from_path(path, self.retrieval.top_k),
            None => {
                tracing::warn!("No corpus configured, retrieval will find nothing");
                Ok(KeywordRetriever::new(Vec::new(), self.retrieval.top_k))
            }
        }
    }

    /// Pipeline over `model` and `retriever` with this configuration's limits
    pub fn build_pipeline_with(
        &self,
        model: Arc<dyn ChatModel>,
        retriever: Arc<dyn Retriever>,
    ) -> Result<SelfRagPipeline, ConfigError> {
        let llm = LlmCollaborators::new(model).with_temperature(self.llm.temperature);
        let collaborators = Collaborators::from_llm(Arc::new(llm), retriever);
        Ok(SelfRagPipeline::new(
            collaborators,
            self.loop_limits(),
            self.execution_config(),
        )?)
    }

    /// Pipeline with the configured model and corpus
    pub fn build_pipeline(&self) -> Result<SelfRagPipeline, ConfigError> {
        let model = self.build_model()?;
        let retriever = Arc::new(self.build_retriever()?);
        self.build_pipeline_with(model, retriever)
    }
}
