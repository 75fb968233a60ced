//! Keepsake Core Library
//!
//! Configuration, error types, domain models, asset discovery and manifest
//! persistence shared by the CDN client and the `publish-media` binary.

pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod manifest;
pub mod models;

// Re-export commonly used types
pub use config::{FailurePolicy, PublisherConfig, SourceLayout, UploadLimits};
pub use discovery::{featured_asset, scan_timeline, Discovery, SkippedFile};
pub use error::{ConfigError, DiscoveryError, ManifestError};
pub use manifest::{Manifest, TimelineUrls};
pub use models::{Asset, Category, ResourceKind, SkipReason};
