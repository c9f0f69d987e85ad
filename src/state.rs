use crate::docs::embed::EmbedBackend;
use crate::docs::VectorIndex;
use crate::llm::SummaryBackend;
use crate::path::normalize::SynonymTable;
use crate::path::recommend::Curriculum;
use crate::path::PathEngine;

/// Tunable engine parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Documents requested from the content index per query.
    pub top_k: usize,
    /// Word bounds for the whole-path narrative summary.
    pub narrative_bounds: (usize, usize),
    /// Word bounds for each step's summary.
    pub item_bounds: (usize, usize),
    /// Leading characters of a document fed to the per-step summary.
    pub summary_source_chars: usize,
    pub preview_chars: usize,
    pub synonyms: SynonymTable,
    pub curriculum: Curriculum,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            narrative_bounds: (20, 50),
            item_bounds: (15, 30),
            summary_source_chars: 500,
            preview_chars: 50,
            synonyms: SynonymTable::default(),
            curriculum: Curriculum::default(),
        }
    }
}

/// The engine as wired up by the binary.
pub type AppEngine = PathEngine<EmbedBackend, VectorIndex, SummaryBackend>;
