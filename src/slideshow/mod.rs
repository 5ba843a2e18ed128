//! MOT slideshow engine: image ingest, carousel selection and object
//! framing.

mod cache;
mod mot;
pub mod quality;

pub use cache::{Carousel, CarouselStatistics, ImageEntry};
pub use mot::{frame, MotObject};

use crate::clock::Clock;
use crate::codec::CodecAdapter;
use crate::error::PadError;
use crate::ingest::{self, PathValidator};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlideshowConfig {
    /// Carousel capacity.
    pub max_images: usize,
    /// Score-driven selection; round-robin when disabled.
    pub smart_selection: bool,
    /// Reject payloads whose fingerprint is already cached.
    pub dedup_enabled: bool,
    /// Cadence of the freshness rescorer.
    pub rescore_interval_secs: u64,
    /// Capacity share above which the rescorer evicts.
    pub pressure_threshold: f64,
    /// Budget for one decode-analyze-encode run.
    pub codec_timeout_ms: u64,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            max_images: 50,
            smart_selection: true,
            dedup_enabled: true,
            rescore_interval_secs: 300,
            pressure_threshold: 0.9,
            codec_timeout_ms: 2000,
        }
    }
}

/// Outcome of a directory scan.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ScanReport {
    pub ingested: usize,
    pub duplicates: usize,
    pub failed: usize,
}

pub struct SlideshowEngine {
    carousel: Mutex<Carousel>,
    codec: Arc<CodecAdapter>,
    paths: Arc<PathValidator>,
    clock: Arc<dyn Clock>,
    config: SlideshowConfig,
    transport_id: AtomicU32,
}

impl SlideshowEngine {
    pub fn new(
        config: SlideshowConfig,
        codec: Arc<CodecAdapter>,
        paths: Arc<PathValidator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let carousel = Carousel::new(config.max_images, config.dedup_enabled);
        Self {
            carousel: Mutex::new(carousel),
            codec,
            paths,
            clock,
            config,
            transport_id: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &SlideshowConfig {
        &self.config
    }

    /// Run the codec pipeline and build an entry, without touching the
    /// cache. Expensive CPU work happens here, outside any lock.
    fn build_entry(&self, filename: &str, bytes: &[u8]) -> Result<ImageEntry, PadError> {
        let decoded = self.codec.decode(bytes)?;
        let metrics = quality::analyze(&decoded);
        let encoded = self.codec.process_decoded(&decoded)?;

        let mut hasher = Sha256::new();
        hasher.update(&encoded.bytes);
        let fingerprint = format!("sha256:{:x}", hasher.finalize());

        Ok(ImageEntry {
            fingerprint,
            filename: filename.to_string(),
            payload: encoded.bytes,
            format: encoded.format,
            width: encoded.width,
            height: encoded.height,
            sharpness: metrics.sharpness,
            contrast: metrics.contrast,
            brightness: metrics.brightness,
            created_at: self.clock.now(),
            last_served: None,
            serve_count: 0,
            freshness: 1.0,
            optimized: true,
        })
    }

    /// Ingest raw bytes: transcode, fingerprint, deduplicate, insert.
    pub fn add_bytes(&self, filename: &str, bytes: &[u8]) -> Result<ImageEntry, PadError> {
        let entry = self.build_entry(filename, bytes)?;
        self.carousel.lock().unwrap().insert(entry.clone())?;
        debug!(
            fingerprint = %entry.fingerprint,
            bytes = entry.payload.len(),
            "ingested slideshow image"
        );
        Ok(entry)
    }

    /// Ingest one file, enforcing the allowed-roots policy and the codec
    /// time budget. A timed-out codec run never mutates the cache: the
    /// entry is only inserted after the deadline check.
    pub async fn add_file(self: &Arc<Self>, path: &Path) -> Result<ImageEntry, PadError> {
        let resolved = self.paths.validate(path)?;
        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| PadError::InvalidInput(format!("read {}: {e}", resolved.display())))?;

        let filename = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());

        let engine = Arc::clone(self);
        let work = tokio::task::spawn_blocking(move || engine.build_entry(&filename, &bytes));
        let entry = match tokio::time::timeout(
            Duration::from_millis(self.config.codec_timeout_ms),
            work,
        )
        .await
        {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(PadError::Internal(format!("codec task failed: {join_err}")))
            }
            Err(_) => return Err(PadError::CodecTimeout),
        };

        self.carousel.lock().unwrap().insert(entry.clone())?;
        debug!(
            fingerprint = %entry.fingerprint,
            bytes = entry.payload.len(),
            "ingested slideshow image"
        );
        Ok(entry)
    }

    /// Scan a directory for image files and ingest each. Individual
    /// failures are logged and counted, never propagated.
    pub async fn scan_directory(self: &Arc<Self>, dir: &Path) -> Result<ScanReport, PadError> {
        let resolved = self.paths.validate(dir)?;
        let files = ingest::list_image_files(&resolved)?;

        let mut report = ScanReport::default();
        for file in files {
            match self.add_file(&file).await {
                Ok(_) => report.ingested += 1,
                Err(PadError::Duplicate) => report.duplicates += 1,
                Err(err) => {
                    warn!(path = %file.display(), error = %err, "image ingest failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            ingested = report.ingested,
            duplicates = report.duplicates,
            failed = report.failed,
            "directory scan complete"
        );
        Ok(report)
    }

    /// Pick the next carousel image and update its serve state.
    pub fn next_image(&self) -> Result<ImageEntry, PadError> {
        let now = self.clock.now();
        let mut carousel = self.carousel.lock().unwrap();
        if self.config.smart_selection {
            carousel.select_smart(now)
        } else {
            carousel.select_round_robin(now)
        }
    }

    /// Frame an entry as a MOT object under a fresh transport id.
    pub fn frame(&self, entry: &ImageEntry) -> MotObject {
        let id = (self.transport_id.fetch_add(1, Ordering::Relaxed) & 0xFFFF) as u16;
        mot::frame(entry, id)
    }

    pub fn remove(&self, fingerprint: &str) -> bool {
        self.carousel.lock().unwrap().remove(fingerprint).is_some()
    }

    pub fn images(&self) -> Vec<ImageEntry> {
        self.carousel.lock().unwrap().snapshot()
    }

    pub fn image_count(&self) -> usize {
        self.carousel.lock().unwrap().len()
    }

    /// Recompute freshness and relieve capacity pressure; the background
    /// rescorer calls this on its tick.
    pub fn rescore(&self) {
        let now = self.clock.now();
        let mut carousel = self.carousel.lock().unwrap();
        carousel.rescore(now);
        if carousel.pressure() > self.config.pressure_threshold {
            carousel.shrink_to_pressure(self.config.pressure_threshold);
        }
    }

    pub fn statistics(&self) -> CarouselStatistics {
        self.carousel.lock().unwrap().statistics()
    }
}
