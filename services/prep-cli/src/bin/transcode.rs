//! Store transcoder.
//!
//! Reads the latest surface currents from a remote ARCO store, coarsens
//! them and writes a verified Zarr v2 store. Prints the run report as JSON
//! on success; exits non-zero on any failure.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use array_transcoder::TranscodeSpec;
use prep_cli::{init_logging, load_transcode_config, transcode, LoggingArgs, SourceConfig, TranscodeConfig};

#[derive(Parser, Debug)]
#[command(name = "transcode")]
#[command(about = "Transcode a remote Zarr store into a small browser-ready store")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "TRANSCODE_CONFIG")]
    config: Option<PathBuf>,

    /// Read the source store from this URL
    #[arg(long, env = "TRANSCODE_STORE_URL", conflicts_with = "local_path")]
    store_url: Option<String>,

    /// Read the source store from a local directory
    #[arg(long)]
    local_path: Option<PathBuf>,

    /// Output store directory
    #[arg(short, long)]
    destination: Option<PathBuf>,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn load_config(args: &Args) -> Result<TranscodeConfig> {
    let mut config = match &args.config {
        Some(path) => load_transcode_config(path)?,
        None => {
            let mut transcode = TranscodeSpec::surface_currents("public/data/currents.zarr");
            transcode.apply_env_overrides();
            TranscodeConfig {
                source: SourceConfig::default(),
                transcode,
            }
        }
    };

    if args.store_url.is_some() || args.local_path.is_some() {
        config.source = SourceConfig {
            store_url: args.store_url.clone(),
            local_path: args.local_path.clone(),
            ..Default::default()
        };
    }
    if let Some(destination) = &args.destination {
        config.transcode.destination = destination.clone();
    }

    anyhow::ensure!(
        config.source != SourceConfig::default(),
        "No source given: use --config, --store-url or --local-path"
    );
    Ok(config)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.logging)?;

    let config = load_config(&args)?;
    info!(
        dataset_id = %config.transcode.dataset_id,
        destination = %config.transcode.destination.display(),
        "Starting transcode"
    );

    let report = transcode(&config).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    Ok(())
}
