use anyhow::Result;

use crate::path::assemble::title_case;
use crate::progress::SessionRecord;

use super::GlobalOpts;

/// Print every recorded session and the completed set.
pub async fn show(opts: &GlobalOpts) -> Result<()> {
    let log = opts.progress_store().load().await;
    if log.is_empty() {
        println!("No sessions recorded yet. Run `learnpath query <text>` to start.");
        return Ok(());
    }

    for record in log.records() {
        print!("{}", render_record(record));
    }

    let mut completed: Vec<String> = log.completed_set().into_iter().collect();
    completed.sort();
    let completed: Vec<String> = completed.iter().map(|c| title_case(c)).collect();
    println!("\nCompleted: {}", completed.join(", "));
    Ok(())
}

/// Recompute keywords for legacy records that lack them.
pub async fn backfill(opts: &GlobalOpts) -> Result<()> {
    let synonyms = opts.synonym_table()?;
    let store = opts.progress_store();
    let updated = store.backfill_keywords(&synonyms).await?;
    println!(
        "Updated keywords on {} record(s) in {}",
        updated,
        store.path().display()
    );
    Ok(())
}

pub fn render_record(record: &SessionRecord) -> String {
    let mut out = format!(
        "Query: {} at {}, Keywords: [{}]\n",
        record.query,
        record.timestamp,
        record.keywords.join(", ")
    );
    for meta in &record.learning_path {
        out.push_str(&format!(
            "  - {} ({})\n",
            title_case(&meta.competency),
            meta.level
        ));
    }
    out
}
