//! Test server lifecycle management.
//!
//! Each test gets an isolated server on a random port with its own image
//! root and fresh engine state. Dropping the server shuts it down.
#![allow(dead_code)]

pub mod fixtures;

use dab_pad_server::clock::SystemClock;
use dab_pad_server::codec::{CodecAdapter, CodecConfig, RasterBackend};
use dab_pad_server::coordinator::{Coordinator, CoordinatorConfig};
use dab_pad_server::dls::{DlsConfig, DlsEngine, OptimizerRules};
use dab_pad_server::ingest::PathValidator;
use dab_pad_server::server::{make_app, ServerState};
use dab_pad_server::sink::{CollectorSink, PadSink};
use dab_pad_server::slideshow::{SlideshowConfig, SlideshowEngine};
use dab_pad_server::validator::{ContentValidator, ValidatorConfig};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub struct TestServer {
    pub base_url: String,
    pub port: u16,
    /// Image ingest root; files written here are accepted by POST /images.
    pub images_dir: TempDir,
    pub slideshow: Arc<SlideshowEngine>,
    pub dls: Arc<DlsEngine>,
    pub coordinator: Arc<Coordinator>,
    pub sink: Arc<CollectorSink>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawn a server on a random port with default engine configuration.
    pub async fn spawn() -> Self {
        let images_dir = TempDir::new().expect("failed to create image root");

        let clock = Arc::new(SystemClock);
        let validator = Arc::new(ContentValidator::new(ValidatorConfig::default()));
        let codec = Arc::new(CodecAdapter::new(
            Arc::new(RasterBackend),
            CodecConfig::default(),
        ));
        let paths = Arc::new(PathValidator::new([images_dir.path().to_path_buf()]));

        let slideshow = Arc::new(SlideshowEngine::new(
            SlideshowConfig::default(),
            codec,
            paths,
            clock.clone(),
        ));
        let dls = Arc::new(DlsEngine::new(
            DlsConfig::default(),
            OptimizerRules::default(),
            validator.clone(),
            clock.clone(),
        ));
        let sink = Arc::new(CollectorSink::new(32));
        let coordinator = Arc::new(Coordinator::new(
            CoordinatorConfig::default(),
            slideshow.clone(),
            dls.clone(),
            sink.clone() as Arc<dyn PadSink>,
            clock,
        ));

        let state = ServerState {
            start_time: std::time::Instant::now(),
            coordinator: coordinator.clone(),
            slideshow: slideshow.clone(),
            dls: dls.clone(),
            validator,
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind to random port");
        let port = listener.local_addr().expect("no local addr").port();
        let base_url = format!("http://127.0.0.1:{port}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let app = make_app(state);
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("server failed");
        });

        Self {
            base_url,
            port,
            images_dir,
            slideshow,
            dls,
            coordinator,
            sink,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
