use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::path::assemble::title_case;
use crate::path::QueryResult;

use super::progress::render_record;
use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Free-text query, e.g. "Learn Python basics"
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    /// Print the result bundle as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: QueryArgs, opts: &GlobalOpts) -> Result<()> {
    let query = args.text.join(" ");
    let engine = opts.build_engine().await?;

    let result = engine
        .process_query(&query)
        .await
        .with_context(|| format!("Error processing query '{}'", query))?;

    info!(
        steps = result.path_details.len(),
        sessions = result.progress.len(),
        "query complete"
    );

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serialize query result")?
        );
    } else {
        print!("{}", render(&result));
    }
    Ok(())
}

/// Human-readable report of a query result.
pub fn render(result: &QueryResult) -> String {
    let mut out = String::new();

    out.push_str("== Learning Path Summary ==\n");
    out.push_str(&result.llm_response);
    out.push_str("\n\n== Learning Path Details ==\n");
    for item in &result.path_details {
        out.push_str(&format!(
            "Step: {} ({}, {})\n  Summary: {}\n  Content Preview: {}\n",
            title_case(&item.competency),
            item.level,
            item.status,
            item.summary,
            item.preview
        ));
    }

    out.push_str("\n== User Progress ==\n");
    for record in result.progress.records() {
        out.push_str(&render_record(record));
    }

    out.push_str("\n== Recommended Topics ==\n");
    let recs: Vec<String> = result
        .recommendations
        .iter()
        .map(|c| title_case(c))
        .collect();
    out.push_str(&recs.join(", "));
    out.push('\n');

    out.push_str("\n== Raw Retrieval Results ==\n");
    for item in &result.raw_results {
        out.push_str(&format!(
            "ID: {}\n  Content: {}\n  Metadata: competency={}, level={}, style={}\n",
            item.id,
            item.content,
            item.metadata.competency,
            item.metadata.level,
            item.metadata.style
        ));
    }
    out
}
