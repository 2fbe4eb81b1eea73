//! Retrieved documents

use serde::{Deserialize, Serialize};

/// Where a document came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_file: String,
    pub page_number: u32,
}

/// A retrieved passage. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, source_file: impl Into<String>, page_number: u32) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                source_file: source_file.into(),
                page_number,
            },
        }
    }

    /// Citation line appended to this document's context block
    pub fn citation(&self) -> String {
        format!(
            "(Source: {}, Page: {})",
            self.metadata.source_file, self.metadata.page_number
        )
    }
}
