//! Local keyword retriever
//!
//! Ranks a fixed corpus with TF-IDF over lowercase word tokens. The corpus is
//! a JSON or YAML list of [`Document`]s:
//!
//! ```yaml
//! - content: "The reflux ratio is the ratio of liquid returned ..."
//!   metadata:
//!     source_file: distillation.pdf
//!     page_number: 112
//! ```

use crate::collaborators::Retriever;
use crate::config::read_structured_file;
use crate::document::Document;
use crate::error::{CollaboratorResult, ConfigError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Default number of documents returned per query
pub const DEFAULT_TOP_K: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "in", "is", "it", "of", "on", "or", "that", "the", "this", "to", "what", "when", "which",
    "why", "with",
];

/// Lowercase alphanumeric tokens, stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

struct IndexedDocument {
    document: Document,
    term_counts: HashMap<String, usize>,
    length: usize,
}

/// In-memory TF-IDF retriever
pub struct KeywordRetriever {
    documents: Vec<IndexedDocument>,
    document_frequency: HashMap<String, usize>,
    top_k: usize,
}

impl KeywordRetriever {
    pub fn new(documents: Vec<Document>, top_k: usize) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let documents: Vec<IndexedDocument> = documents
            .into_iter()
            .map(|document| {
                let tokens = tokenize(&document.content);
                let mut term_counts: HashMap<String, usize> = HashMap::new();
                for token in &tokens {
                    *term_counts.entry(token.clone()).or_default() += 1;
                }
                for term in term_counts.keys() {
                    *document_frequency.entry(term.clone()).or_default() += 1;
                }
                IndexedDocument {
                    document,
                    term_counts,
                    length: tokens.len(),
                }
            })
            .collect();

        Self {
            documents,
            document_frequency,
            top_k,
        }
    }

    /// Load a corpus file (`.json`, `.yaml` or `.yml`)
    pub fn from_path(path: impl AsRef<Path>, top_k: usize) -> Result<Self, ConfigError> {
        let documents: Vec<Document> = read_structured_file(path.as_ref())?;
        tracing::info!(
            "Loaded {} documents from {}",
            documents.len(),
            path.as_ref().display()
        );
        Ok(Self::new(documents, top_k))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.documents.len() as f64;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    /// Documents matching at least one query term, best first
    pub fn search(&self, query: &str) -> Vec<(f64, &Document)> {
        let terms: HashSet<String> = tokenize(query).into_iter().collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &Document)> = self
            .documents
            .iter()
            .filter_map(|indexed| {
                if indexed.length == 0 {
                    return None;
                }
                let score: f64 = terms
                    .iter()
                    .filter_map(|term| {
                        indexed.term_counts.get(term).map(|&count| {
                            (count as f64 / indexed.length as f64) * self.idf(term)
                        })
                    })
                    .sum();
                (score > 0.0).then_some((score, &indexed.document))
            })
            .collect();

        // Stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k);
        scored
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str) -> CollaboratorResult<Vec<Document>> {
        let hits = self.search(query);
        tracing::debug!("Retrieved {} documents for {:?}", hits.len(), query);
        Ok(hits.into_iter().map(|(_, doc)| doc.clone()).collect())
    }
}
