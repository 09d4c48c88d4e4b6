// src/document/mod.rs
// Requirement document model: an immutable block of text carved into an
// addressable section tree by the segmenter.

mod segmenter;

pub use segmenter::{parent_map, segment};

use serde::{Deserialize, Serialize};

/// One addressable section of a requirement document. Created during
/// segmentation, read-only afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Dotted numeric identifier, e.g. "1.1.2". Unique within a document.
    pub id: String,
    pub title: String,
    /// Heading depth: "1." is depth 2, "1.1" depth 3, "1.1.1" depth 4.
    pub depth: usize,
    /// Byte offset of the section's own heading line.
    pub start: usize,
    /// Byte offset of the next heading of depth <= this one, or end of text.
    pub end: usize,
}

impl Section {
    /// Dotted-prefix parent id, e.g. "1.1.2" -> Some("1.1"), "3" -> None.
    pub fn parent_id(&self) -> Option<String> {
        self.id.rsplit_once('.').map(|(prefix, _)| prefix.to_string())
    }

    /// The section's slice of the original document.
    pub fn content<'a>(&self, document: &'a str) -> &'a str {
        &document[self.start..self.end]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document contains no recognizable section headings")]
    NoSectionsFound,

    #[error("document is empty")]
    EmptyDocument,
}

/// Synthetic single section spanning the whole document, used by the
/// orchestrator when segmentation finds no headings.
pub fn fallback_section(document: &str) -> Section {
    let title = document
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Requirement")
        .chars()
        .take(60)
        .collect::<String>();
    Section {
        id: "1".to_string(),
        title,
        depth: 2,
        start: 0,
        end: document.len(),
    }
}
