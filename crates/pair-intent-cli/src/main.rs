mod cli;

use anyhow::Result;
use clap::Parser;
use pair_intent::config::AppConfig;
use tracing_subscriber::EnvFilter;

use cli::{Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // CLI flags > config file > env vars > defaults
    let config = AppConfig::from_cli(&cli.config)?;
    let handler = CliHandler::new(config)?;
    handler.run(cli.command).await
}
