//! Upload error types

use std::io;
use std::path::PathBuf;

/// Upload failure for one asset. Every variant is fatal for that asset.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    /// The host answered with a non-success status.
    #[error("Upload failed for {}: {status} {body}", path.display())]
    Rejected {
        path: PathBuf,
        status: u16,
        body: String,
    },

    #[error("Failed to send request for {}: {source}", path.display())]
    Request {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unexpected response for {}: {reason}", path.display())]
    MalformedResponse { path: PathBuf, reason: String },
}

impl UploadError {
    /// HTTP status returned by the host, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Rejected { status, .. } => Some(*status),
            UploadError::Request { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short machine-readable label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Client(_) => "client",
            UploadError::InvalidChunkSize => "invalid_chunk_size",
            UploadError::Rejected { .. } => "rejected",
            UploadError::Request { .. } => "request",
            UploadError::Io { .. } => "io",
            UploadError::MalformedResponse { .. } => "malformed_response",
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
