use anyhow::Result;
use clap::Parser;
use larder_storage::LarderConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Larder upload and public file server", long_about = None)]
struct Args {
    /// Configuration file (default: layered larder.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configured one
    #[arg(short, long)]
    bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = match &args.config {
        Some(path) => LarderConfig::from_file(path)?,
        None => LarderConfig::load()?,
    };

    let bind = args
        .bind
        .clone()
        .unwrap_or_else(|| config.server().bind().clone());

    info!(
        bind = %bind,
        web_root = %config.storage().web_root().display(),
        "Starting larder server"
    );

    let state = larder_server::build_state(&config)?;
    larder_server::serve(state, &bind).await?;

    Ok(())
}
