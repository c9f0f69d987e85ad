use anyhow::{Context, Result};
use tracing::debug;

use crate::docs::types::{Level, RetrievedDoc};
use crate::docs::{ContentIndex, Embedder};

use super::normalize::KeywordSet;

/// Level rules in priority order. The first rule with any keyword present
/// decides the filter.
const LEVEL_RULES: &[(Level, &[&str])] = &[
    (
        Level::Beginner,
        &["basics", "variables", "loops", "fundamentals", "introduction"],
    ),
    (
        Level::Intermediate,
        &["functions", "classes", "lists", "methods", "objects"],
    ),
    (
        Level::Advanced,
        &["decorators", "generators", "async", "wrappers", "iterators", "concurrent"],
    ),
];

/// Map a keyword set to an optional level filter.
pub fn build_filter(keywords: &KeywordSet) -> Option<Level> {
    LEVEL_RULES
        .iter()
        .find(|(_, words)| words.iter().any(|w| keywords.contains(*w)))
        .map(|(level, _)| *level)
}

/// Embed `query` and fetch up to `k` matching documents from the index.
pub async fn retrieve<E, I>(
    embedder: &E,
    index: &I,
    query: &str,
    filter: Option<Level>,
    k: usize,
) -> Result<Vec<RetrievedDoc>>
where
    E: Embedder,
    I: ContentIndex,
{
    let embedding = embedder
        .embed_one(query)
        .await
        .context("Failed to embed query")?;
    let results = index
        .query(&embedding, filter, k)
        .await
        .context("Content index query failed")?;
    debug!(hits = results.len(), k, filter = ?filter, "retrieval complete");
    Ok(results)
}
