//! Graph visualization
//!
//! Renders a [`Graph`] in three formats:
//! - **DOT** for Graphviz (`dot -Tpng graph.dot -o graph.png`)
//! - **Mermaid** for markdown documentation
//! - **ASCII** for quick terminal output
//!
//! Routed edges are drawn dashed and their source nodes as diamonds, so the
//! cycles of a graph are visible at a glance.
//!
//! ```rust,ignore
//! use selfrag_graph::visualization::{visualize, VisualizationOptions};
//!
//! let compiled = graph.compile()?;
//! let mermaid = visualize(compiled.graph(), &VisualizationOptions::mermaid().with_title("Pipeline"));
//! println!("```mermaid\n{}```", mermaid);
//! ```
//!
//! Node order follows insertion order, so output is stable between runs.

use crate::graph::{Edge, Graph, END, START};
use crate::state::GraphState;
use std::fmt;
use std::str::FromStr;

/// Graph visualization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizationFormat {
    /// DOT format for Graphviz
    Dot,
    /// Mermaid diagram format
    Mermaid,
    /// Simple ASCII art
    Ascii,
}

impl fmt::Display for VisualizationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VisualizationFormat::Dot => "dot",
            VisualizationFormat::Mermaid => "mermaid",
            VisualizationFormat::Ascii => "ascii",
        };
        f.write_str(name)
    }
}

impl FromStr for VisualizationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" | "graphviz" => Ok(VisualizationFormat::Dot),
            "mermaid" | "mmd" => Ok(VisualizationFormat::Mermaid),
            "ascii" | "text" => Ok(VisualizationFormat::Ascii),
            other => Err(format!("unknown visualization format: {}", other)),
        }
    }
}

/// Visualization options
#[derive(Debug, Clone)]
pub struct VisualizationOptions {
    /// Output format
    pub format: VisualizationFormat,
    /// Graph title/label
    pub title: Option<String>,
    /// Highlight the entry node
    pub mark_entry: bool,
}

impl Default for VisualizationOptions {
    fn default() -> Self {
        Self {
            format: VisualizationFormat::Dot,
            title: None,
            mark_entry: true,
        }
    }
}

impl VisualizationOptions {
    pub fn new(format: VisualizationFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Create with DOT format
    pub fn dot() -> Self {
        Self::new(VisualizationFormat::Dot)
    }

    /// Create with Mermaid format
    pub fn mermaid() -> Self {
        Self::new(VisualizationFormat::Mermaid)
    }

    /// Create with ASCII format
    pub fn ascii() -> Self {
        Self::new(VisualizationFormat::Ascii)
    }

    /// Set title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn without_entry_marker(mut self) -> Self {
        self.mark_entry = false;
        self
    }
}

/// Visualize a graph as a string
pub fn visualize<S: GraphState>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    match options.format {
        VisualizationFormat::Dot => visualize_dot(graph, options),
        VisualizationFormat::Mermaid => visualize_mermaid(graph, options),
        VisualizationFormat::Ascii => visualize_ascii(graph, options),
    }
}

fn visualize_dot<S: GraphState>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("digraph G {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n");

    if let Some(title) = &options.title {
        output.push_str("    labelloc=\"t\";\n");
        output.push_str(&format!("    label=\"{}\";\n", escape_dot(title)));
    }

    output.push_str(&format!(
        "    \"{}\" [shape=circle, style=filled, fillcolor=green];\n",
        START
    ));
    output.push_str(&format!(
        "    \"{}\" [shape=circle, style=filled, fillcolor=red];\n",
        END
    ));

    for node_id in graph.node_ids() {
        let shape = match graph.edge(node_id) {
            Some(edge) if edge.is_conditional() => ", shape=diamond",
            _ => "",
        };
        output.push_str(&format!(
            "    \"{}\" [label=\"{}\"{}];\n",
            escape_dot(node_id),
            escape_dot(node_id),
            shape
        ));
    }

    if let Some(entry) = graph.entry() {
        let style = if options.mark_entry { " [penwidth=2]" } else { "" };
        output.push_str(&format!(
            "    \"{}\" -> \"{}\"{};\n",
            START,
            escape_dot(entry),
            style
        ));
    }

    for from in graph.node_ids() {
        match graph.edge(from) {
            Some(Edge::Direct(to)) => {
                output.push_str(&format!(
                    "    \"{}\" -> \"{}\";\n",
                    escape_dot(from),
                    escape_dot(to)
                ));
            }
            Some(Edge::Conditional { branches, .. }) => {
                for to in branches {
                    output.push_str(&format!(
                        "    \"{}\" -> \"{}\" [style=dashed];\n",
                        escape_dot(from),
                        escape_dot(to)
                    ));
                }
            }
            None => {}
        }
    }

    output.push_str("}\n");
    output
}

fn visualize_mermaid<S: GraphState>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("graph TD\n");

    if let Some(title) = &options.title {
        output.push_str(&format!("    title[\"{}\"]\n", escape_mermaid(title)));
    }

    output.push_str(&format!("    {}((START))\n", sanitize_id(START)));
    output.push_str(&format!(
        "    style {} fill:#90EE90,stroke:#228B22,stroke-width:3px\n",
        sanitize_id(START)
    ));
    output.push_str(&format!("    {}((END))\n", sanitize_id(END)));
    output.push_str(&format!(
        "    style {} fill:#FFB6C1,stroke:#DC143C,stroke-width:3px\n",
        sanitize_id(END)
    ));

    for node_id in graph.node_ids() {
        let conditional = graph.edge(node_id).map_or(false, Edge::is_conditional);
        let (open, close, fill) = if conditional {
            ("{", "}", "fill:#FFE4B5,stroke:#FF8C00")
        } else {
            ("[", "]", "fill:#F0F0F0,stroke:#666")
        };
        output.push_str(&format!(
            "    {}{}\"{}\"{}\n",
            sanitize_id(node_id),
            open,
            escape_mermaid(node_id),
            close
        ));
        output.push_str(&format!(
            "    style {} {},stroke-width:2px\n",
            sanitize_id(node_id),
            fill
        ));
    }

    if let Some(entry) = graph.entry() {
        let arrow = if options.mark_entry { "==>" } else { "-->" };
        output.push_str(&format!(
            "    {} {} {}\n",
            sanitize_id(START),
            arrow,
            sanitize_id(entry)
        ));
    }

    for from in graph.node_ids() {
        match graph.edge(from) {
            Some(Edge::Direct(to)) => {
                output.push_str(&format!(
                    "    {} --> {}\n",
                    sanitize_id(from),
                    sanitize_id(to)
                ));
            }
            Some(Edge::Conditional { branches, .. }) => {
                for to in branches {
                    output.push_str(&format!(
                        "    {} -.-> {}\n",
                        sanitize_id(from),
                        sanitize_id(to)
                    ));
                }
            }
            None => {}
        }
    }

    output
}

fn visualize_ascii<S: GraphState>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    match &options.title {
        Some(title) => {
            output.push_str(title);
            output.push('\n');
            output.push_str(&"=".repeat(title.chars().count()));
            output.push_str("\n\n");
        }
        None => output.push_str("Graph Structure:\n================\n\n"),
    }

    output.push_str(&format!(
        "START -> {}\n",
        graph.entry().unwrap_or("(no entry)")
    ));

    for node_id in graph.node_ids() {
        output.push_str(&format!("\n[{}]\n", node_id));
        match graph.edge(node_id) {
            Some(Edge::Direct(to)) => output.push_str(&format!("  -> {}\n", display_id(to))),
            Some(Edge::Conditional { branches, .. }) => {
                output.push_str("  -> (routed)\n");
                for to in branches {
                    output.push_str(&format!("     ? {}\n", display_id(to)));
                }
            }
            None => output.push_str("  (no outgoing edge)\n"),
        }
    }

    output.push_str("\nEND\n");
    output
}

fn display_id(id: &str) -> &str {
    if id == END {
        "END"
    } else {
        id
    }
}

/// Escape special characters for DOT format
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Escape special characters for Mermaid format
fn escape_mermaid(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Mermaid ids must be alphanumeric + underscore
fn sanitize_id(s: &str) -> String {
    s.replace("__", "").replace(['-', '.', ' '], "_")
}
