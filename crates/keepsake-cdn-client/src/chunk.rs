//! Chunk planning for large uploads.
//!
//! A file larger than the chunk size is sent as consecutive, non-overlapping
//! byte windows that share one upload session id.

use std::fmt;
use std::num::NonZeroU64;

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;

const SESSION_SUFFIX_LEN: usize = 10;

/// Inclusive byte range `[start, end]` of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the window.
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a file of `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Fixed-size windows covering a file of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total: u64,
    chunk_size: NonZeroU64,
}

impl ChunkPlan {
    pub fn new(total: u64, chunk_size: NonZeroU64) -> Self {
        Self { total, chunk_size }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether the file fits in a single request. The boundary is inclusive.
    pub fn is_single(&self) -> bool {
        self.total <= self.chunk_size.get()
    }

    pub fn chunk_count(&self) -> u64 {
        self.total.div_ceil(self.chunk_size.get())
    }

    /// Windows in ascending offset order; the last may be shorter.
    pub fn ranges(&self) -> impl Iterator<Item = ByteRange> + '_ {
        let size = self.chunk_size.get();
        (0..self.chunk_count()).map(move |i| {
            let start = i * size;
            let end = (start + size).min(self.total) - 1;
            ByteRange { start, end }
        })
    }
}

/// Identifier shared by every chunk of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession(String);

impl UploadSession {
    /// `<unix millis>-<random lowercase alphanumerics>`
    pub fn generate() -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(format!("{}-{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UploadSession {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
