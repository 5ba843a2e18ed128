use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dab_pad_server::clock::SystemClock;
use dab_pad_server::codec::{CodecAdapter, RasterBackend};
use dab_pad_server::config::{AppConfig, CliConfig, FileConfig};
use dab_pad_server::coordinator::Coordinator;
use dab_pad_server::dls::DlsEngine;
use dab_pad_server::ingest::PathValidator;
use dab_pad_server::server::{run_server, ServerState};
use dab_pad_server::sink::{CollectorSink, PadSink};
use dab_pad_server::slideshow::SlideshowEngine;
use dab_pad_server::validator::ContentValidator;

#[derive(Parser, Debug)]
#[command(about = "DAB+ PAD engine: MOT slideshow and DLS streams with a control surface")]
struct CliArgs {
    /// Path to an optional TOML configuration file.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directories images may be ingested from. The first one is scanned
    /// at startup when --scan-on-start is set.
    #[clap(long = "images-dir")]
    pub image_roots: Vec<PathBuf>,

    /// The port for the control surface.
    #[clap(short, long, default_value_t = 8008)]
    pub port: u16,

    /// Address to bind the control surface to.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Skip the startup scan of the image directories.
    #[clap(long)]
    pub no_startup_scan: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        port: cli_args.port,
        bind_address: cli_args.bind_address,
        image_roots: cli_args.image_roots,
        scan_on_start: !cli_args.no_startup_scan,
    };
    let config = AppConfig::resolve(&cli_config, file_config).context("resolving configuration")?;

    let clock = Arc::new(SystemClock);
    let validator = Arc::new(ContentValidator::new(config.validator.clone()));
    let codec = Arc::new(CodecAdapter::new(
        Arc::new(RasterBackend),
        config.codec.clone(),
    ));
    let paths = Arc::new(PathValidator::new(config.image_roots.clone()));

    let slideshow = Arc::new(SlideshowEngine::new(
        config.slideshow.clone(),
        codec,
        paths,
        clock.clone(),
    ));
    let dls = Arc::new(DlsEngine::new(
        config.dls.clone(),
        config.optimizer.clone(),
        validator.clone(),
        clock.clone(),
    ));

    if config.scan_on_start {
        for root in &config.image_roots {
            info!("scanning image directory {}", root.display());
            match slideshow.scan_directory(root).await {
                Ok(report) => info!(
                    ingested = report.ingested,
                    duplicates = report.duplicates,
                    failed = report.failed,
                    "startup scan of {} complete",
                    root.display()
                ),
                Err(err) => error!("startup scan of {} failed: {err}", root.display()),
            }
        }
    }

    let sink: Arc<dyn PadSink> = Arc::new(CollectorSink::new(32));
    let coordinator = Arc::new(Coordinator::new(
        config.coordinator.clone(),
        slideshow.clone(),
        dls.clone(),
        sink,
        clock,
    ));

    let cancel = CancellationToken::new();
    let coordinator_task = tokio::spawn(coordinator.clone().run(cancel.child_token()));

    let state = ServerState {
        start_time: std::time::Instant::now(),
        coordinator,
        slideshow,
        dls,
        validator,
    };

    info!("ready to serve at port {}!", config.port);
    let server_cancel = cancel.child_token();
    let server_task = tokio::spawn(async move {
        run_server(state, &config.bind_address, config.port, server_cancel).await
    });

    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;
    info!("shutdown signal received");
    cancel.cancel();

    coordinator_task.await.context("joining coordinator")?;
    server_task
        .await
        .context("joining control surface")?
        .context("control surface error")?;
    info!("shutdown complete");
    Ok(())
}
