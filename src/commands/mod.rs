mod progress;
mod query;
mod recommend;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::{info, warn};

use crate::docs::embed::EmbedBackend;
use crate::docs::ingest::ingest_dir;
use crate::docs::VectorIndex;
use crate::llm::SummaryBackend;
use crate::path::normalize::SynonymTable;
use crate::path::recommend::Curriculum;
use crate::path::PathEngine;
use crate::progress::ProgressStore;
use crate::state::{AppEngine, EngineConfig};

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Directory of content files to index at startup
    #[arg(long, global = true, env = "LEARNPATH_CONTENT_DIR", default_value = "data/content")]
    pub content_dir: PathBuf,

    /// Progress log (JSON array of session records)
    #[arg(long, global = true, env = "LEARNPATH_PROGRESS", default_value = "progress.json")]
    pub progress: PathBuf,

    /// Documents retrieved per query
    #[arg(long, global = true, env = "LEARNPATH_TOP_K", default_value_t = 2)]
    pub top_k: usize,

    /// JSON synonym table ({"key": ["synonym", ...]}) replacing the built-in one
    #[arg(long, global = true, env = "LEARNPATH_SYNONYMS")]
    pub synonyms: Option<PathBuf>,

    /// Curriculum order for recommendations, comma separated
    #[arg(long, global = true, env = "LEARNPATH_CURRICULUM", value_delimiter = ',')]
    pub curriculum: Option<Vec<String>>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a learning path for a free-text query and record the session
    Query(query::QueryArgs),
    /// Show recorded sessions and completed topics
    Progress,
    /// Fill in keywords for progress records saved without them
    Backfill,
    /// Recommend next topics from current progress
    Recommend,
}

impl GlobalOpts {
    pub fn synonym_table(&self) -> Result<SynonymTable> {
        match &self.synonyms {
            Some(path) => SynonymTable::from_json_file(path),
            None => Ok(SynonymTable::default()),
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        anyhow::ensure!(self.top_k > 0, "--top-k must be at least 1");
        let mut config = EngineConfig {
            top_k: self.top_k,
            synonyms: self.synonym_table()?,
            ..Default::default()
        };
        if let Some(order) = &self.curriculum {
            config.curriculum = Curriculum::new(
                order
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty()),
            );
        }
        Ok(config)
    }

    pub fn progress_store(&self) -> ProgressStore {
        ProgressStore::new(&self.progress)
    }

    /// Wire up backends from the environment and index the content directory.
    pub async fn build_engine(&self) -> Result<AppEngine> {
        let config = self.engine_config()?;

        let embedder = EmbedBackend::from_env()?;
        let mut index = VectorIndex::new();
        ingest_dir(&self.content_dir, &embedder, &mut index).await?;
        if index.is_empty() {
            warn!(
                dir = %self.content_dir.display(),
                "no content indexed, every path will be empty"
            );
        }

        let summarizer = SummaryBackend::from_env()?;
        info!(
            documents = index.len(),
            embedder = embedder.name(),
            summarizer = summarizer.name(),
            top_k = config.top_k,
            "engine ready"
        );

        Ok(PathEngine::new(
            embedder,
            index,
            summarizer,
            self.progress_store(),
            config,
        ))
    }
}

pub async fn run(command: Command, opts: &GlobalOpts) -> Result<()> {
    match command {
        Command::Query(args) => query::run(args, opts).await,
        Command::Progress => progress::show(opts).await,
        Command::Backfill => progress::backfill(opts).await,
        Command::Recommend => recommend::run(opts).await,
    }
}
