use anyhow::Result;
use clap::Parser;
use psync::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment (bind-password override lives here).
    dotenvy::dotenv().ok();

    // Initialize tracing for the CLI.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "psync exited with error");
    }
    result
}
