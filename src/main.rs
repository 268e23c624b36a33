//! bitrix-rest - read-only REST service over a Bitrix catalog database.

use std::path::PathBuf;

use clap::Parser;

use bitrix_rest::config::DEFAULT_CONFIG_PATH;
use bitrix_rest::{Config, ServeResult, server};

/// Read-only REST service over a Bitrix catalog database
#[derive(Parser, Debug)]
#[command(name = "bitrix-rest")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "BITRIX_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    bitrix_query::logging::init();

    run(Cli::parse()).await?;
    Ok(())
}

async fn run(cli: Cli) -> ServeResult<()> {
    let config = Config::from_file(&cli.config)?;
    tracing::info!(path = %cli.config.display(), "configuration loaded");

    if cli.check {
        return Ok(());
    }
    server::run(config).await
}
