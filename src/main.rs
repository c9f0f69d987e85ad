mod commands;
mod docs;
mod llm;
mod path;
mod progress;
mod state;

use clap::Parser;
use tracing::Level;

use commands::{Command, GlobalOpts};

/// Personalized learning paths over a local content library.
#[derive(Parser, Debug)]
#[command(name = "learnpath", version)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env before clap so `.env` values feed the env fallbacks
    let _ = dotenv::dotenv();

    let level = dotenv::var("LEARNPATH_LOG")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli.command, &cli.opts).await
}
