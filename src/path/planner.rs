use std::collections::HashSet;

use tracing::debug;

use crate::docs::types::RetrievedDoc;

/// Order retrieval results into a learning path.
///
/// Completed competencies are dropped and the rest sorted by level
/// (stable, so same-level items keep retrieval order). If that leaves
/// nothing, the full retrieval set is used instead, sorted the same way,
/// so a non-empty retrieval always yields a non-empty path.
pub fn plan(results: &[RetrievedDoc], completed: &HashSet<String>) -> Vec<RetrievedDoc> {
    let mut path: Vec<RetrievedDoc> = results
        .iter()
        .filter(|r| !completed.contains(&r.metadata.competency))
        .cloned()
        .collect();

    if path.is_empty() && !results.is_empty() {
        debug!(
            retrieved = results.len(),
            "every retrieved competency completed, falling back to full set"
        );
        path = results.to_vec();
    }

    path.sort_by_key(|r| r.metadata.level);
    path
}
