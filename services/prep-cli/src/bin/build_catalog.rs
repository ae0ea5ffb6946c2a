//! Catalog builder.
//!
//! Describes each configured target dataset and writes the catalog JSON
//! consumed by the browser client. Targets that cannot be cataloged are
//! logged and skipped; the catalog is always written.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use prep_cli::{build_catalog, init_logging, load_catalog_config, LoggingArgs};

#[derive(Parser, Debug)]
#[command(name = "build-catalog")]
#[command(about = "Build the dataset catalog from provider metadata")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/catalog.yaml", env = "CATALOG_CONFIG")]
    config: PathBuf,

    /// Override the describe document location (path or URL)
    #[arg(long, env = "CATALOG_DESCRIBE_SOURCE")]
    describe_source: Option<String>,

    /// Override the output path
    #[arg(short, long, env = "CATALOG_OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.logging)?;

    info!(config = %args.config.display(), "Starting catalog build");

    let mut config = load_catalog_config(&args.config)?;
    if let Some(source) = args.describe_source {
        config.describe_source = source;
    }
    if let Some(output) = args.output {
        config.output = output;
    }

    build_catalog(&config).await?;
    Ok(())
}
