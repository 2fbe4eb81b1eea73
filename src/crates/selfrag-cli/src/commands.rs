//! Subcommand handlers

use crate::render::{self, OutputFormat};
use anyhow::{bail, Context};
use async_trait::async_trait;
use futures::StreamExt;
use selfrag::{RagConfig, SelfRagPipeline};
use selfrag_graph::llm::{ChatModel, ChatRequest, ChatResponse};
use selfrag_graph::{GraphError, StepStatus, VisualizationFormat, VisualizationOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line values that take precedence over file and environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub corpus: Option<PathBuf>,
}

/// File (or defaults), then `SELFRAG_*` variables, then flags, then validation
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<RagConfig> {
    let mut config = match path {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::default(),
    };
    config.apply_env()?;
    if let Some(model) = &overrides.model {
        config.llm.model = model.clone();
    }
    if let Some(corpus) = &overrides.corpus {
        config.retrieval.corpus_path = Some(corpus.clone());
    }
    config.validate()?;
    Ok(config)
}

pub async fn ask(
    config: &RagConfig,
    question: &str,
    trace: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let pipeline = config.build_pipeline()?;
    let mut stream = pipeline.stream(question);
    let mut last = None;

    while let Some(snapshot) = stream.next().await {
        if trace {
            let rendered = match format {
                OutputFormat::Text => render::step_block(&snapshot)?,
                OutputFormat::Json => render::step_line(&snapshot)?,
            };
            println!("{}", rendered);
            if format == OutputFormat::Text {
                println!();
            }
        }
        last = Some(snapshot);
    }

    let last = last.context("run produced no snapshots")?;
    if !trace || format == OutputFormat::Text {
        println!("{}", render::final_answer(&last.state, format)?);
    }

    if last.status == StepStatus::Failed {
        if let Some(failure) = &last.failure {
            bail!("run failed: {}", failure);
        }
    }
    Ok(())
}

/// Stand-in model for rendering the topology without a provider
struct Offline;

#[async_trait]
impl ChatModel for Offline {
    async fn chat(&self, _request: ChatRequest) -> selfrag_graph::Result<ChatResponse> {
        Err(GraphError::Model("no model configured".to_string()))
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

pub fn graph(
    config: &RagConfig,
    format: VisualizationFormat,
    title: Option<String>,
) -> anyhow::Result<()> {
    let pipeline = topology(config)?;
    let mut options = VisualizationOptions::new(format);
    if let Some(title) = title {
        options = options.with_title(title);
    }
    println!("{}", pipeline.visualize(&options));
    Ok(())
}

fn topology(config: &RagConfig) -> anyhow::Result<SelfRagPipeline> {
    let retriever = Arc::new(selfrag::KeywordRetriever::new(Vec::new(), config.retrieval.top_k));
    Ok(config.build_pipeline_with(Arc::new(Offline), retriever)?)
}

#[derive(Debug, Serialize)]
struct HealthReport {
    provider: String,
    model: String,
    base_url: String,
    model_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_error: Option<String>,
    corpus: Option<PathBuf>,
    documents: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    corpus_error: Option<String>,
}

impl HealthReport {
    fn healthy(&self) -> bool {
        self.model_available && self.corpus_error.is_none()
    }
}

pub async fn health(config: &RagConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (model_available, model_error) = match config.build_model() {
        Ok(model) => match model.is_available().await {
            Ok(available) => (available, None),
            Err(e) => (false, Some(e.to_string())),
        },
        Err(e) => (false, Some(e.to_string())),
    };

    let (documents, corpus_error) = match config.build_retriever() {
        Ok(retriever) => (retriever.len(), None),
        Err(e) => (0, Some(e.to_string())),
    };

    let report = HealthReport {
        provider: config.llm.provider.to_string(),
        model: config.llm.model.clone(),
        base_url: config.llm.base_url().to_string(),
        model_available,
        model_error,
        corpus: config.retrieval.corpus_path.clone(),
        documents,
        corpus_error,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_health(&report),
    }

    if !report.healthy() {
        bail!("health check failed");
    }
    Ok(())
}

fn print_health(report: &HealthReport) {
    let mark = |ok: bool| if ok { "✓" } else { "✗" };

    println!("selfrag health");
    println!("==============");
    println!(
        "{} model   {} '{}' at {}",
        mark(report.model_available),
        report.provider,
        report.model,
        report.base_url
    );
    if let Some(error) = &report.model_error {
        println!("    {}", error);
    }

    match &report.corpus {
        Some(path) => println!(
            "{} corpus  {} ({} documents)",
            mark(report.corpus_error.is_none()),
            path.display(),
            report.documents
        ),
        None => println!("- corpus  not configured"),
    }
    if let Some(error) = &report.corpus_error {
        println!("    {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "llm:\n  model: llama3.2\nretrieval:\n  top_k: 4").unwrap();

        let overrides = Overrides {
            model: Some("qwen2.5".into()),
            corpus: Some(PathBuf::from("corpus.json")),
        };
        let config = load_config(Some(file.path()), &overrides).unwrap();

        assert_eq!(config.llm.model, "qwen2.5");
        assert_eq!(config.retrieval.corpus_path, Some(PathBuf::from("corpus.json")));
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let overrides = Overrides {
            model: Some("  ".into()),
            corpus: None,
        };
        assert!(load_config(None, &overrides).is_err());
    }

    #[test]
    fn test_topology_renders_without_model() {
        let pipeline = topology(&RagConfig::default()).unwrap();
        let ascii = pipeline.visualize(&VisualizationOptions::ascii());

        assert!(ascii.contains("START -> decide_retrieval"));
        assert!(ascii.contains("[best_effort]"));
        assert!(ascii.contains("? rewrite_question"));
    }

    #[tokio::test]
    async fn test_offline_model_refuses() {
        let err = Offline.chat(ChatRequest::new(vec![])).await.unwrap_err();
        assert!(err.to_string().contains("no model configured"));
    }
}
