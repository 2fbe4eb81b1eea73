//! selfrag - ask grounded questions against a local document corpus
//!
//! ```text
//! selfrag ask "What sets the minimum reflux ratio?" --trace
//! selfrag graph --format mermaid
//! selfrag health
//! ```

mod commands;
mod render;

use clap::{Parser, Subcommand};
use render::OutputFormat;
use selfrag_graph::VisualizationFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "selfrag")]
#[command(about = "Self-correcting retrieval-augmented question answering", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, global = true, env = "SELFRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Model name, overriding the configuration
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Document corpus, overriding the configuration
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Log filter, e.g. "info" or "selfrag=debug" (defaults to RUST_LOG, then warn)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print every step of the run as it happens
        #[arg(short, long)]
        trace: bool,

        /// Output format: text (default), json
        #[arg(short, long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Render the pipeline topology
    Graph {
        /// Output format: mermaid (default), dot, ascii
        #[arg(short, long, default_value = "mermaid")]
        format: VisualizationFormat,

        /// Diagram title
        #[arg(long)]
        title: Option<String>,
    },

    /// Check the model endpoint and the corpus
    Health {
        /// Output format: text (default), json
        #[arg(short, long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let overrides = commands::Overrides {
        model: cli.model,
        corpus: cli.corpus,
    };
    let config = commands::load_config(cli.config.as_deref(), &overrides)?;
    tracing::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Ask {
            question,
            trace,
            format,
        } => commands::ask(&config, &question.join(" "), trace, format).await,
        Commands::Graph { format, title } => commands::graph(&config, format, title),
        Commands::Health { format } => commands::health(&config, format).await,
    }
}
