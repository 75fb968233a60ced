//! Asset discovery
//!
//! Lists the timeline directory and the two featured files, classifies each
//! candidate and applies the extension and size filters. Filtered files are
//! returned alongside the assets so callers can log them.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::UploadLimits;
use crate::constants::TIMELINE_FOLDER;
use crate::error::DiscoveryError;
use crate::models::{
    file_name_of, is_disallowed_extension, Asset, Category, ResourceKind, SkipReason,
};

/// A file seen during the scan but left out of the upload set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of scanning one source location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Assets in upload order
    pub assets: Vec<Asset>,
    pub skipped: Vec<SkippedFile>,
}

/// Scan the timeline directory. A missing directory yields an empty result.
pub async fn scan_timeline(dir: &Path, limits: &UploadLimits) -> Result<Discovery, DiscoveryError> {
    let read_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| DiscoveryError::Read { path, source }
    };

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "Timeline directory not found, nothing to scan");
            return Ok(Discovery::default());
        }
        Err(e) => return Err(read_err(dir)(e)),
    };

    let mut listed = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err(dir))? {
        listed.push(entry);
    }
    listed.sort_by_key(|entry| entry.file_name());

    let mut discovery = Discovery::default();
    for entry in listed {
        let path = entry.path();
        let name = file_name_of(&path);
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Name-based filters run before any stat so broken entries never fail the scan.
        if is_disallowed_extension(&ext) {
            tracing::debug!(file = %name, "Skipping disallowed format");
            discovery.skipped.push(SkippedFile {
                path,
                reason: SkipReason::DisallowedFormat,
            });
            continue;
        }

        let Some(kind) = ResourceKind::from_extension(&ext) else {
            tracing::debug!(file = %name, "Skipping unsupported file");
            discovery.skipped.push(SkippedFile {
                path,
                reason: SkipReason::UnsupportedExtension,
            });
            continue;
        };

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            tracing::warn!("Skipping {} ({}).", name, SkipReason::NonUtf8Name);
            discovery.skipped.push(SkippedFile {
                path,
                reason: SkipReason::NonUtf8Name,
            });
            continue;
        };

        let metadata = fs::metadata(&path).await.map_err(read_err(&path))?;
        if !metadata.is_file() {
            tracing::debug!(file = %name, "Skipping non-file entry");
            discovery.skipped.push(SkippedFile {
                path,
                reason: SkipReason::UnsupportedExtension,
            });
            continue;
        }

        let size = metadata.len();
        if kind == ResourceKind::Image && size > limits.max_image_size {
            let reason = SkipReason::OversizedImage {
                size,
                limit: limits.max_image_size,
            };
            tracing::warn!("Skipping {} ({}).", name, reason);
            discovery.skipped.push(SkippedFile { path, reason });
            continue;
        }

        discovery.assets.push(Asset {
            category: Category::Timeline,
            folder: TIMELINE_FOLDER.to_string(),
            id: stem,
            kind,
            size,
            path,
        });
    }

    Ok(discovery)
}

/// Describe a singleton file if it exists. Absence is not an error, and
/// featured files bypass the extension and size filters.
pub async fn featured_asset(
    path: &Path,
    category: Category,
    folder: &str,
    id: &str,
    kind: ResourceKind,
) -> Result<Option<Asset>, DiscoveryError> {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(file = %path.display(), "Featured file not present");
            return Ok(None);
        }
        Err(source) => {
            return Err(DiscoveryError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if !metadata.is_file() {
        tracing::debug!(file = %file_name_of(path), "Featured path is not a file");
        return Ok(None);
    }

    Ok(Some(Asset {
        path: path.to_path_buf(),
        category,
        folder: folder.to_string(),
        id: id.to_string(),
        kind,
        size: metadata.len(),
    }))
}
