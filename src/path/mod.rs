pub mod assemble;
pub mod filter;
pub mod normalize;
pub mod planner;
pub mod recommend;

use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::docs::types::RetrievedDoc;
use crate::docs::{ContentIndex, Embedder};
use crate::llm::Summarizer;
use crate::progress::{ProgressLog, ProgressStore, SessionRecord};
use crate::state::EngineConfig;

use assemble::{preview, PathItem};

/// Everything one query produces.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub llm_response: String,
    pub path_details: Vec<PathItem>,
    /// Full progress log, including the record for this query.
    pub progress: ProgressLog,
    pub recommendations: Vec<String>,
    /// Unfiltered retrieval results with content cut to a preview.
    pub raw_results: Vec<RetrievedDoc>,
}

/// Retrieval, path planning and progress tracking over injected backends.
pub struct PathEngine<E, I, S> {
    embedder: E,
    index: I,
    summarizer: S,
    progress: ProgressStore,
    config: EngineConfig,
}

impl<E, I, S> PathEngine<E, I, S>
where
    E: Embedder,
    I: ContentIndex,
    S: Summarizer,
{
    pub fn new(
        embedder: E,
        index: I,
        summarizer: S,
        progress: ProgressStore,
        config: EngineConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            summarizer,
            progress,
            config,
        }
    }

    pub fn progress_store(&self) -> &ProgressStore {
        &self.progress
    }

    /// Competencies in the index not yet completed, in curriculum order.
    pub async fn recommendations(&self, completed: &HashSet<String>) -> Result<Vec<String>> {
        let all = self.index.competencies().await?;
        Ok(self.config.curriculum.recommend(&all, completed))
    }

    /// Run one query end to end and record it in the progress log.
    ///
    /// Backend failures abort the query before anything is recorded. A
    /// failure to persist the log does not: the returned progress then
    /// includes a record that is not on disk.
    pub async fn process_query(&self, query: &str) -> Result<QueryResult> {
        let keywords = normalize::normalize(query, &self.config.synonyms);
        let level = filter::build_filter(&keywords);
        info!(query, keywords = ?keywords, level = ?level, "processing query");

        let results = filter::retrieve(
            &self.embedder,
            &self.index,
            query,
            level,
            self.config.top_k,
        )
        .await?;

        let log = self.progress.load().await;
        let completed = log.completed_set();

        let path = planner::plan(&results, &completed);
        debug!(
            retrieved = results.len(),
            planned = path.len(),
            completed = completed.len(),
            "path planned"
        );

        let assembled =
            assemble::assemble(&path, &completed, &self.summarizer, &self.config).await?;
        let recommendations = self.recommendations(&completed).await?;

        let record = SessionRecord::new(
            query,
            keywords.into_iter().collect(),
            path.iter().map(|p| p.metadata.clone()).collect(),
        );
        info!(
            steps = record.learning_path.len(),
            completed = ?record.completed,
            "recording session"
        );
        let progress = self.progress.append(log, record).await;

        let raw_results = results
            .into_iter()
            .map(|r| RetrievedDoc {
                content: preview(&r.content, self.config.preview_chars),
                ..r
            })
            .collect();

        Ok(QueryResult {
            llm_response: assembled.llm_response,
            path_details: assembled.path_details,
            progress,
            recommendations,
            raw_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::embed::HashEmbedder;
    use crate::docs::types::{DocMeta, Document, Level};
    use crate::docs::VectorIndex;
    use crate::llm::ExtractiveSummarizer;
    use crate::path::assemble::Status;

    const BASICS: &str = "Python basics cover variables, loops and simple data types. \
        Start by printing values and storing them in variables.";
    const INTERMEDIATE: &str = "Intermediate Python covers functions, classes and methods. \
        Functions group reusable logic and classes bundle data with behaviour.";

    fn index(embedder: &HashEmbedder) -> VectorIndex {
        let mut index = VectorIndex::new();
        for (id, competency, level, content) in [
            ("doc1", "python_basics", Level::Beginner, BASICS),
            ("doc2", "python_intermediate", Level::Intermediate, INTERMEDIATE),
        ] {
            index
                .add(
                    Document {
                        id: id.to_string(),
                        content: content.to_string(),
                        meta: DocMeta {
                            competency: competency.to_string(),
                            level,
                            style: "textual".to_string(),
                        },
                    },
                    embedder.embed_text(content),
                )
                .unwrap();
        }
        index
    }

    fn engine<S: Summarizer>(
        dir: &tempfile::TempDir,
        summarizer: S,
    ) -> PathEngine<HashEmbedder, VectorIndex, S> {
        let embedder = HashEmbedder::default();
        let index = index(&embedder);
        PathEngine::new(
            embedder,
            index,
            summarizer,
            ProgressStore::new(dir.path().join("progress.json")),
            EngineConfig::default(),
        )
    }

    struct FailingSummarizer;

    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _text: &str, _min: usize, _max: usize) -> Result<String> {
            anyhow::bail!("summarizer offline")
        }
    }

    #[tokio::test]
    async fn test_basics_query_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, ExtractiveSummarizer);

        let result = engine.process_query("Learn Python basics").await.unwrap();

        assert_eq!(result.path_details[0].competency, "python_basics");
        assert_eq!(result.path_details[0].status, Status::ToLearn);
        assert_eq!(result.path_details[0].level, Level::Beginner);
        assert!(result.llm_response.contains("Python Basics"));

        assert_eq!(result.progress.len(), 1);
        let record = &result.progress.records()[0];
        assert_eq!(record.completed.as_deref(), Some("python_basics"));
        assert_eq!(record.keywords, vec!["basics", "learn", "python"]);
        assert_eq!(record.learning_path[0].competency, "python_basics");

        // Recommendations are computed before this query's record lands
        assert_eq!(
            result.recommendations,
            vec!["python_basics", "python_intermediate"]
        );

        // Persisted to disk
        let reloaded = engine.progress_store().load().await;
        assert_eq!(reloaded, result.progress);
    }

    #[tokio::test]
    async fn test_completed_topic_falls_back_and_shows_completed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, ExtractiveSummarizer);

        engine.process_query("Learn Python basics").await.unwrap();
        let result = engine.process_query("Learn Python basics").await.unwrap();

        // Beginner filter only retrieves the completed basics doc
        assert_eq!(result.path_details.len(), 1);
        assert_eq!(result.path_details[0].competency, "python_basics");
        assert_eq!(result.path_details[0].status, Status::Completed);
        assert_eq!(result.recommendations, vec!["python_intermediate"]);
        assert_eq!(result.progress.len(), 2);
    }

    #[tokio::test]
    async fn test_unfiltered_query_skips_completed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, ExtractiveSummarizer);

        engine.process_query("Learn Python basics").await.unwrap();
        let result = engine.process_query("python").await.unwrap();

        assert_eq!(result.raw_results.len(), 2);
        assert_eq!(result.path_details.len(), 1);
        assert_eq!(result.path_details[0].competency, "python_intermediate");
        assert_eq!(
            result.progress.records()[1].completed.as_deref(),
            Some("python_intermediate")
        );
    }

    #[tokio::test]
    async fn test_raw_results_are_previewed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, ExtractiveSummarizer);

        let result = engine.process_query("Learn Python basics").await.unwrap();
        let raw = &result.raw_results[0];
        assert_eq!(raw.content, format!("{}...", &BASICS[..50]));
        assert_eq!(raw.metadata.competency, "python_basics");
    }

    #[tokio::test]
    async fn test_empty_query_still_records_session() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, ExtractiveSummarizer);

        let result = engine.process_query("   ").await.unwrap();
        assert_eq!(result.raw_results.len(), 2);
        assert_eq!(result.progress.len(), 1);
        assert!(result.progress.records()[0].keywords.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, FailingSummarizer);

        let err = engine.process_query("Learn Python basics").await.unwrap_err();
        assert!(format!("{:#}", err).contains("summarizer offline"));
        assert!(engine.progress_store().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_matching_content() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(&dir, ExtractiveSummarizer);

        // Advanced filter, but the index holds no advanced content
        let result = engine.process_query("python decorators").await.unwrap();
        assert!(result.path_details.is_empty());
        assert_eq!(result.llm_response, assemble::EMPTY_PATH_RESPONSE);
        assert_eq!(result.progress.records()[0].completed, None);
    }
}
