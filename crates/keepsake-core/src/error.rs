//! Error types module
//!
//! Each stage of the publisher owns a small error enum. Skipped files are not
//! errors and are reported through [`crate::SkipReason`] instead.

use std::io;
use std::path::PathBuf;

/// Invalid or missing process configuration. Raised before any I/O happens.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to resolve working directory: {0}")]
    WorkingDir(#[source] io::Error),
}

/// Failure while listing the local source directories.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure while persisting the manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write manifest {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
