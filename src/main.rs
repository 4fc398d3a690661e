use clap::Parser;
use fairplay_ksm::config::{resolve_config_path, FALLBACK_CONFIG_PATH_FILE};
use fairplay_ksm::server::shutdown_signal;
use fairplay_ksm::{serve, AppState, Config};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "fps-ksm")]
#[command(about = "FairPlay Streaming key server")]
struct Args {
    /// YAML config file
    #[arg(long, env = "CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Listen address, overrides server.listen
    #[arg(long, env = "LISTEN_ADDR")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let path = resolve_config_path(args.config_file, Path::new(FALLBACK_CONFIG_PATH_FILE))?;
    info!(path = %path.display(), "loading configuration");
    let config = Config::load(&path)?;

    let ksm = config.build_engine()?;
    info!(
        certificate_hash = %hex::encode(ksm.keys().certificate_hash()),
        "FairPlay keys loaded"
    );

    let addr = config.listen_addr(args.listen.as_deref())?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, AppState::new(ksm), shutdown_signal()).await?;

    info!("server stopped");
    Ok(())
}
