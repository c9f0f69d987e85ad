use anyhow::Result;

use crate::path::assemble::title_case;

use super::GlobalOpts;

/// Print next topics without running a query.
pub async fn run(opts: &GlobalOpts) -> Result<()> {
    let engine = opts.build_engine().await?;
    let completed = engine.progress_store().load().await.completed_set();
    let recs = engine.recommendations(&completed).await?;

    if recs.is_empty() {
        println!("Nothing left to recommend: every indexed topic is completed.");
    } else {
        for (i, competency) in recs.iter().enumerate() {
            println!("{}. {}", i + 1, title_case(competency));
        }
    }
    Ok(())
}
