pub mod embed;
pub mod ingest;
pub mod types;

use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use types::{Document, Level, RetrievedDoc};

/// Turns text into fixed-length vectors. Documents are embedded in batches
/// at ingestion, queries one at a time.
#[allow(async_fn_in_trait)]
pub trait Embedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text]).await?;
        anyhow::ensure!(vectors.len() == 1, "embedder returned {} vectors for 1 input", vectors.len());
        Ok(vectors.remove(0))
    }
}

/// Similarity search over embedded documents.
#[allow(async_fn_in_trait)]
pub trait ContentIndex {
    /// Top-`k` documents by similarity to `embedding`, optionally restricted
    /// to one level. May return fewer than `k` hits.
    async fn query(
        &self,
        embedding: &[f32],
        level: Option<Level>,
        k: usize,
    ) -> Result<Vec<RetrievedDoc>>;

    /// Every distinct competency held by the index, in ingestion order.
    async fn competencies(&self) -> Result<Vec<String>>;
}

struct IndexEntry {
    doc: Document,
    embedding: Vec<f32>,
}

/// In-memory cosine-similarity index. Rebuilt from the content directory
/// at every process start.
#[derive(Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dim: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. Idempotent: a document with an existing ID replaces
    /// the stored entry in place.
    pub fn add(&mut self, doc: Document, embedding: Vec<f32>) -> Result<()> {
        anyhow::ensure!(!embedding.is_empty(), "empty embedding for document {}", doc.id);
        match self.dim {
            Some(dim) => anyhow::ensure!(
                embedding.len() == dim,
                "embedding dimension {} does not match index dimension {}",
                embedding.len(),
                dim
            ),
            None => self.dim = Some(embedding.len()),
        }

        debug!(doc_id = %doc.id, competency = %doc.meta.competency, "indexing document");
        if let Some(existing) = self.entries.iter_mut().find(|e| e.doc.id == doc.id) {
            existing.doc = doc;
            existing.embedding = embedding;
        } else {
            self.entries.push(IndexEntry { doc, embedding });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentIndex for VectorIndex {
    async fn query(
        &self,
        embedding: &[f32],
        level: Option<Level>,
        k: usize,
    ) -> Result<Vec<RetrievedDoc>> {
        if let Some(dim) = self.dim {
            anyhow::ensure!(
                embedding.len() == dim,
                "query embedding dimension {} does not match index dimension {}",
                embedding.len(),
                dim
            );
        }

        let mut scored: Vec<(f32, &Document)> = self
            .entries
            .iter()
            .filter(|e| level.map_or(true, |l| e.doc.meta.level == l))
            .map(|e| (cosine_similarity(embedding, &e.embedding), &e.doc))
            .collect();

        // Stable: equal scores keep ingestion order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        debug!(
            hits = scored.len(),
            k,
            level = ?level,
            "vector index query"
        );
        Ok(scored.into_iter().map(|(_, doc)| RetrievedDoc::from(doc)).collect())
    }

    async fn competencies(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .entries
            .iter()
            .map(|e| e.doc.meta.competency.clone())
            .filter(|c| seen.insert(c.clone()))
            .collect())
    }
}

/// Cosine similarity; zero when either vector has no magnitude or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
