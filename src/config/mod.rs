mod file_config;

pub use file_config::FileConfig;

use crate::codec::CodecConfig;
use crate::coordinator::CoordinatorConfig;
use crate::dls::{DlsConfig, OptimizerRules};
use crate::slideshow::SlideshowConfig;
use crate::validator::ValidatorConfig;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments subject to file-config override.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub bind_address: String,
    pub image_roots: Vec<PathBuf>,
    pub scan_on_start: bool,
}

/// Fully resolved configuration, immutable while the engines run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind_address: String,
    pub image_roots: Vec<PathBuf>,
    pub scan_on_start: bool,

    pub slideshow: SlideshowConfig,
    pub codec: CodecConfig,
    pub dls: DlsConfig,
    pub optimizer: OptimizerRules,
    pub validator: ValidatorConfig,
    pub coordinator: CoordinatorConfig,
}

impl AppConfig {
    /// Resolve from CLI arguments and an optional TOML file. File values
    /// override CLI values where present.
    pub fn resolve(cli: &CliConfig, file: Option<FileConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let image_roots: Vec<PathBuf> = file
            .image_roots
            .map(|roots| roots.into_iter().map(PathBuf::from).collect())
            .unwrap_or_else(|| cli.image_roots.clone());

        for root in &image_roots {
            if !root.is_dir() {
                bail!("image root is not a directory: {}", root.display());
            }
        }

        Ok(Self {
            port: file.port.unwrap_or(cli.port),
            bind_address: file
                .bind_address
                .unwrap_or_else(|| cli.bind_address.clone()),
            image_roots,
            scan_on_start: file.scan_on_start.unwrap_or(cli.scan_on_start),
            slideshow: file.slideshow.unwrap_or_default(),
            codec: file.codec.unwrap_or_default(),
            dls: file.dls.unwrap_or_default(),
            optimizer: file.optimizer.unwrap_or_default(),
            validator: file.validator.unwrap_or_default(),
            coordinator: file.coordinator.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli() -> CliConfig {
        CliConfig {
            port: 8008,
            bind_address: "0.0.0.0".to_string(),
            image_roots: Vec::new(),
            scan_on_start: false,
        }
    }

    #[test]
    fn file_values_override_cli() {
        let file = FileConfig {
            port: Some(9999),
            ..FileConfig::default()
        };
        let config = AppConfig::resolve(&cli(), Some(file)).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn missing_file_falls_back_to_cli() {
        let config = AppConfig::resolve(&cli(), None).unwrap();
        assert_eq!(config.port, 8008);
        assert_eq!(config.dls.max_len, 128);
        assert_eq!(config.slideshow.max_images, 50);
    }

    #[test]
    fn nonexistent_image_root_is_rejected() {
        let mut args = cli();
        args.image_roots = vec![PathBuf::from("/no/such/dir/for/pad")];
        assert!(AppConfig::resolve(&args, None).is_err());
    }

    #[test]
    fn existing_image_root_is_accepted() {
        let dir = TempDir::new().unwrap();
        let mut args = cli();
        args.image_roots = vec![dir.path().to_path_buf()];
        let config = AppConfig::resolve(&args, None).unwrap();
        assert_eq!(config.image_roots.len(), 1);
    }
}
