use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::types::{DocId, DocMeta, Document, Level};
use super::{Embedder, VectorIndex};

const DEFAULT_STYLE: &str = "textual";

/// Content-addressed document ID: first 16 hex chars of the blake3 hash.
pub fn doc_id(content: &str) -> DocId {
    blake3::hash(content.as_bytes()).to_hex()[..16].to_string()
}

/// Derive document metadata from a content file stem, e.g.
/// `python_basics` -> (python_basics, beginner).
pub fn meta_from_stem(stem: &str) -> DocMeta {
    let lower = stem.to_lowercase();
    let level = if lower.contains("basics") {
        Level::Beginner
    } else if lower.contains("advanced") {
        Level::Advanced
    } else {
        Level::Intermediate
    };
    DocMeta {
        competency: stem.to_string(),
        level,
        style: DEFAULT_STYLE.to_string(),
    }
}

async fn read_text(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
        .unwrap_or(false);

    if is_html {
        Ok(html2text::from_read(&bytes[..], 120)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).to_string()))
    } else {
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}

/// Ingest every regular file in `dir` into `index`, embedding them in one
/// batch. A missing directory yields zero documents. Returns the number of
/// documents indexed.
pub async fn ingest_dir<E: Embedder>(
    dir: &Path,
    embedder: &E,
    index: &mut VectorIndex,
) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "content directory not found, index is empty");
            return Ok(0);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to list {}", dir.display()));
        }
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), "skipping entry: {}", e),
        }
    }
    paths.sort();

    let mut docs = Vec::with_capacity(paths.len());
    for path in &paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping file with non-UTF-8 name");
            continue;
        };
        match read_text(path).await {
            Ok(content) if content.trim().is_empty() => {
                warn!(path = %path.display(), "skipping empty file");
            }
            Ok(content) => docs.push(Document {
                id: doc_id(&content),
                meta: meta_from_stem(stem),
                content,
            }),
            Err(e) => warn!(path = %path.display(), "skipping unreadable file: {:#}", e),
        }
    }

    if docs.is_empty() {
        return Ok(0);
    }

    let texts: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
    let embeddings = embedder
        .embed(&texts)
        .await
        .context("Failed to embed content documents")?;
    anyhow::ensure!(
        embeddings.len() == docs.len(),
        "embedder returned {} vectors for {} documents",
        embeddings.len(),
        docs.len()
    );

    let count = docs.len();
    for (doc, embedding) in docs.into_iter().zip(embeddings) {
        index.add(doc, embedding)?;
    }

    info!(dir = %dir.display(), count, "content ingested");
    Ok(count)
}
