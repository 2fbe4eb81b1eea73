//! Context assembly

use crate::document::Document;

/// Separator between document blocks
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Build the citation-annotated context for grounded generation.
///
/// Each document becomes its content followed by its citation line. An empty
/// slice yields an empty string.
pub fn assemble_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| format!("{}\n{}", doc.content, doc.citation()))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}
