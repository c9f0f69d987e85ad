use std::fmt;

use serde::{Deserialize, Serialize};

/// Content-addressed document ID (truncated blake3 hex hash).
pub type DocId = String;

/// Difficulty level of a piece of content. Declaration order is the
/// curriculum order: beginner < intermediate < advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stored alongside each document in the content index.
/// This is also the form a learning path takes inside a progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    /// Topic key, e.g. "python_basics"
    pub competency: String,
    pub level: Level,
    /// Presentation style, e.g. "textual"
    pub style: String,
}

/// An ingested document. Immutable once added to an index.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
    pub meta: DocMeta,
}

/// One similarity-search hit. Field names follow the index wire shape
/// (`ids`, `documents`, `metadatas`) so raw results serialize naturally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDoc {
    pub id: DocId,
    pub content: String,
    pub metadata: DocMeta,
}

impl From<&Document> for RetrievedDoc {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            content: doc.content.clone(),
            metadata: doc.meta.clone(),
        }
    }
}
