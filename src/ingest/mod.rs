//! Filesystem ingest: allowed-roots path validation and directory scans.

use crate::error::PadError;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// File extensions the scanner treats as slideshow candidates.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];

/// Validates that ingest paths stay inside the configured roots.
///
/// Canonicalizes before checking, so symlinks and `..` segments cannot
/// escape. An empty root list rejects everything.
pub struct PathValidator {
    allowed_roots: Vec<PathBuf>,
}

impl PathValidator {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let allowed_roots = roots
            .into_iter()
            .map(|root| root.canonicalize().unwrap_or(root))
            .collect();
        Self { allowed_roots }
    }

    /// Resolve and check a path, returning its canonical form.
    pub fn validate(&self, path: &Path) -> Result<PathBuf, PadError> {
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(PadError::InvalidInput(format!(
                "path traversal rejected: {}",
                path.display()
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            PadError::InvalidInput(format!("cannot resolve {}: {e}", path.display()))
        })?;

        if self
            .allowed_roots
            .iter()
            .any(|root| canonical.starts_with(root))
        {
            Ok(canonical)
        } else {
            Err(PadError::InvalidInput(format!(
                "path outside allowed roots: {}",
                path.display()
            )))
        }
    }
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List image files directly inside `dir`, sorted by name so scans are
/// deterministic. Non-image files are ignored; unreadable entries are
/// logged and skipped.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>, PadError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        PadError::InvalidInput(format!("cannot read directory {}: {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
