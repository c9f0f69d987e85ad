use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::docs::types::{DocMeta, Level, RetrievedDoc};
use crate::llm::Summarizer;
use crate::state::EngineConfig;

/// Returned as `llm_response` when retrieval produced nothing to plan.
pub const EMPTY_PATH_RESPONSE: &str = "No learning content matched this query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Completed,
    #[serde(rename = "To Learn")]
    ToLearn,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Completed => f.write_str("Completed"),
            Status::ToLearn => f.write_str("To Learn"),
        }
    }
}

/// One step of a learning path as presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathItem {
    pub id: String,
    pub competency: String,
    pub level: Level,
    pub status: Status,
    pub summary: String,
    pub preview: String,
}

/// Narrative summary plus per-step details.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub llm_response: String,
    pub path_details: Vec<PathItem>,
}

/// Title-case a competency key: underscores become spaces and every
/// letter following a non-letter is uppercased, the rest lowercased.
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_is_letter = false;
    for c in key.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// `"Python Basics (beginner level)"`
pub fn summary_line(meta: &DocMeta) -> String {
    format!("{} ({} level)", title_case(&meta.competency), meta.level)
}

/// First `max_chars` characters of `content` followed by an ellipsis.
pub fn preview(content: &str, max_chars: usize) -> String {
    let head: String = content.chars().take(max_chars).collect();
    format!("{}...", head)
}

/// Numbered narrative, one line per path step.
pub fn narrative(path: &[RetrievedDoc]) -> String {
    path.iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, summary_line(&item.metadata)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn status_for(competency: &str, completed: &HashSet<String>) -> Status {
    if completed.contains(competency) {
        Status::Completed
    } else {
        Status::ToLearn
    }
}

/// Build the narrative summary and per-item details for a planned path.
/// `completed` must be the completed set from before planning, so items
/// brought back by the planner's fallback still show as completed.
pub async fn assemble<S: Summarizer>(
    path: &[RetrievedDoc],
    completed: &HashSet<String>,
    summarizer: &S,
    config: &EngineConfig,
) -> Result<Assembled> {
    let llm_response = if path.is_empty() {
        EMPTY_PATH_RESPONSE.to_string()
    } else {
        let text = format!("Learning path:\n{}", narrative(path));
        let (min, max) = config.narrative_bounds;
        summarizer
            .summarize(&text, min, max)
            .await
            .context("Failed to summarize learning path")?
    };

    let mut path_details = Vec::with_capacity(path.len());
    for item in path {
        let head: String = item.content.chars().take(config.summary_source_chars).collect();
        let (min, max) = config.item_bounds;
        let summary = summarizer
            .summarize(&head, min, max)
            .await
            .with_context(|| format!("Failed to summarize document {}", item.id))?;

        path_details.push(PathItem {
            id: item.id.clone(),
            competency: item.metadata.competency.clone(),
            level: item.metadata.level,
            status: status_for(&item.metadata.competency, completed),
            summary,
            preview: preview(&item.content, config.preview_chars),
        });
    }

    debug!(steps = path_details.len(), "response assembled");
    Ok(Assembled {
        llm_response,
        path_details,
    })
}
