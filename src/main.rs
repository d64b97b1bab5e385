use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging on stderr; the tree goes to stdout
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting reqtree v{}", env!("CARGO_PKG_VERSION"));

    cli.execute()
}
