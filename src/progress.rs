use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::docs::types::DocMeta;
use crate::path::normalize::{normalize, SynonymTable};

/// One processed query. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// RFC 3339 timestamp of when the query was processed.
    pub timestamp: String,
    pub query: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub learning_path: Vec<DocMeta>,
    /// Competency of the first path item, if there was one.
    #[serde(default)]
    pub completed: Option<String>,
}

impl SessionRecord {
    /// Build a record for a planned path. `completed` is always the
    /// competency of the first step.
    pub fn new(query: &str, keywords: Vec<String>, learning_path: Vec<DocMeta>) -> Self {
        let completed = learning_path.first().map(|m| m.competency.clone());
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            query: query.to_string(),
            keywords,
            learning_path,
            completed,
        }
    }
}

/// Chronologically ordered session records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressLog {
    records: Vec<SessionRecord>,
}

impl ProgressLog {
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every competency marked completed by some session.
    pub fn completed_set(&self) -> HashSet<String> {
        self.records
            .iter()
            .filter_map(|r| r.completed.clone())
            .collect()
    }
}

impl From<Vec<SessionRecord>> for ProgressLog {
    fn from(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }
}

pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log. Missing or malformed files yield an empty log.
    pub async fn load(&self) -> ProgressLog {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no progress file yet");
                return ProgressLog::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read progress file: {}", e);
                return ProgressLog::default();
            }
        };

        match serde_json::from_slice::<ProgressLog>(&bytes) {
            Ok(log) => {
                debug!(records = log.len(), "progress loaded");
                log
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring malformed progress file: {}", e);
                ProgressLog::default()
            }
        }
    }

    /// Write the whole log through a temp file and rename it over the
    /// target, creating the parent directory if needed. A crash mid-write
    /// leaves the previous log intact.
    pub async fn persist(&self, log: &ProgressLog) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_vec_pretty(log).context("serialize progress log")?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("Failed to replace {}", self.path.display()));
        }
        Ok(())
    }

    /// Append `record` and persist. Best-effort: a persist failure is
    /// logged and swallowed, and the returned log still contains the new
    /// record even though it may not have landed on disk.
    pub async fn append(&self, mut log: ProgressLog, record: SessionRecord) -> ProgressLog {
        log.records.push(record);
        if let Err(e) = self.persist(&log).await {
            warn!(
                path = %self.path.display(),
                records = log.len(),
                "Progress not saved: {:#}",
                e
            );
        }
        log
    }

    /// Fill in `keywords` for legacy records that were written without
    /// them, then rewrite the file. Returns how many records changed.
    pub async fn backfill_keywords(&self, synonyms: &SynonymTable) -> Result<usize> {
        let mut log = self.load().await;
        let mut updated = 0;
        for record in log.records.iter_mut().filter(|r| r.keywords.is_empty()) {
            record.keywords = normalize(&record.query, synonyms).into_iter().collect();
            updated += 1;
        }

        if updated > 0 {
            self.persist(&log).await?;
        }
        info!(updated, total = log.len(), "keyword backfill complete");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::Level;

    fn meta(competency: &str, level: Level) -> DocMeta {
        DocMeta {
            competency: competency.to_string(),
            level,
            style: "textual".to_string(),
        }
    }

    #[test]
    fn test_record_completed_is_first_item() {
        let record = SessionRecord::new(
            "learn python",
            vec!["learn".to_string(), "python".to_string()],
            vec![
                meta("python_basics", Level::Beginner),
                meta("python_intermediate", Level::Intermediate),
            ],
        );
        assert_eq!(record.completed.as_deref(), Some("python_basics"));

        let empty = SessionRecord::new("nothing", vec![], vec![]);
        assert_eq!(empty.completed, None);
    }

    #[test]
    fn test_completed_set() {
        let log = ProgressLog::from(vec![
            SessionRecord::new("a", vec![], vec![meta("python_basics", Level::Beginner)]),
            SessionRecord::new("b", vec![], vec![]),
            SessionRecord::new("c", vec![], vec![meta("python_basics", Level::Beginner)]),
        ]);
        let completed = log.completed_set();
        assert_eq!(completed.len(), 1);
        assert!(completed.contains("python_basics"));
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));

        let mut log = store.load().await;
        assert!(log.is_empty());
        for i in 0..3 {
            let record = SessionRecord::new(
                &format!("query {}", i),
                vec![format!("kw{}", i)],
                vec![meta(&format!("topic_{}", i), Level::Intermediate)],
            );
            log = store.append(log, record).await;
        }

        let reloaded = store.load().await;
        assert_eq!(reloaded, log);
        let queries: Vec<_> = reloaded.records().iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["query 0", "query 1", "query 2"]);
    }

    #[tokio::test]
    async fn test_append_creates_missing_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("progress.json");
        let store = ProgressStore::new(&path);

        let mut log = ProgressLog::default();
        for query in ["first", "second"] {
            let record =
                SessionRecord::new(query, vec![], vec![meta("python_basics", Level::Beginner)]);
            log = store.append(log, record).await;
        }

        assert_eq!(log.len(), 2);
        assert_eq!(store.load().await, log);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_persist_replaces_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "[]").unwrap();
        let store = ProgressStore::new(&path);

        let log = ProgressLog::from(vec![SessionRecord::new("q", vec![], vec![])]);
        store.persist(&log).await.unwrap();
        assert_eq!(store.load().await, log);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ this is not json").unwrap();
        let store = ProgressStore::new(&path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_append_survives_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the file makes every write fail
        let path = dir.path().join("progress.json");
        std::fs::create_dir(&path).unwrap();
        let store = ProgressStore::new(&path);

        let log = store
            .append(
                ProgressLog::default(),
                SessionRecord::new("q", vec![], vec![meta("python_basics", Level::Beginner)]),
            )
            .await;
        assert_eq!(log.len(), 1);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_reads_legacy_records_without_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(
            &path,
            r#"[{"timestamp": "2024-05-01T10:00:00", "query": "Learn Python basics",
                "learning_path": [{"competency": "python_basics", "level": "beginner", "style": "textual"}]}]"#,
        )
        .unwrap();
        let store = ProgressStore::new(&path);

        let log = store.load().await;
        assert_eq!(log.len(), 1);
        assert!(log.records()[0].keywords.is_empty());
        assert_eq!(log.records()[0].completed, None);

        let updated = store.backfill_keywords(&SynonymTable::default()).await.unwrap();
        assert_eq!(updated, 1);
        let log = store.load().await;
        assert_eq!(log.records()[0].keywords, vec!["basics", "learn", "python"]);

        // Already-filled records are left alone
        assert_eq!(store.backfill_keywords(&SynonymTable::default()).await.unwrap(), 0);
    }
}
