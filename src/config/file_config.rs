use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::codec::CodecConfig;
use crate::coordinator::CoordinatorConfig;
use crate::dls::{DlsConfig, OptimizerRules};
use crate::slideshow::SlideshowConfig;
use crate::validator::ValidatorConfig;

/// TOML file configuration. Every field is optional; present values
/// override CLI arguments.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub image_roots: Option<Vec<String>>,
    pub scan_on_start: Option<bool>,

    // Engine sections, each with full defaults.
    pub slideshow: Option<SlideshowConfig>,
    pub codec: Option<CodecConfig>,
    pub dls: Option<DlsConfig>,
    pub optimizer: Option<OptimizerRules>,
    pub validator: Option<ValidatorConfig>,
    pub coordinator: Option<CoordinatorConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}
