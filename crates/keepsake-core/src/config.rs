//! Configuration module
//!
//! The publisher reads its environment once, at process entry, into a
//! [`PublisherConfig`] that is then passed down by reference.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{
    CHUNK_SIZE_BYTES, DEFAULT_API_URL, DEFAULT_UPLOAD_TIMEOUT_SECS, FEATURED_AUDIO_PATH,
    FEATURED_VIDEO_PATH, MANIFEST_PATH, MAX_IMAGE_SIZE_BYTES, TIMELINE_DIR,
};
use crate::error::ConfigError;

const CLOUD_NAME_KEY: &str = "CLOUDINARY_CLOUD_NAME";
const UPLOAD_PRESET_KEY: &str = "CLOUDINARY_UPLOAD_PRESET";
const API_URL_KEY: &str = "CLOUDINARY_API_URL";
const ROOT_KEY: &str = "KEEPSAKE_ROOT";
const TIMEOUT_KEY: &str = "UPLOAD_TIMEOUT_SECS";
const FAILURE_POLICY_KEY: &str = "UPLOAD_FAILURE_POLICY";

/// What the pipeline does when one asset fails to upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure.
    #[default]
    AbortOnFirst,
    /// Attempt every asset, then report all failures together.
    CollectAll,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "abort-on-first" => Ok(FailurePolicy::AbortOnFirst),
            "collect" | "collect-all" => Ok(FailurePolicy::CollectAll),
            other => Err(format!("expected 'abort' or 'collect', got '{}'", other)),
        }
    }
}

/// Size thresholds for discovery and upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Single-request ceiling and chunk window, in bytes
    pub chunk_size: u64,
    /// Images above this are skipped
    pub max_image_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE_BYTES,
            max_image_size: MAX_IMAGE_SIZE_BYTES,
        }
    }
}

/// Local paths consumed and produced by a run, all under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    root: PathBuf,
}

impl SourceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn timeline_dir(&self) -> PathBuf {
        self.root.join(TIMELINE_DIR)
    }

    pub fn featured_video(&self) -> PathBuf {
        self.root.join(FEATURED_VIDEO_PATH)
    }

    pub fn featured_audio(&self) -> PathBuf {
        self.root.join(FEATURED_AUDIO_PATH)
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_PATH)
    }
}

/// Publisher configuration
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    /// Base URL of the upload API, without trailing slash
    pub api_url: String,
    pub layout: SourceLayout,
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    pub limits: UploadLimits,
}

impl PublisherConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let root = match env::var(ROOT_KEY) {
            Ok(root) if !root.trim().is_empty() => PathBuf::from(root),
            _ => env::current_dir().map_err(ConfigError::WorkingDir)?,
        };

        Self::from_lookup(root, |key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `default_root` is used
    /// unless the lookup provides `KEEPSAKE_ROOT`.
    pub fn from_lookup<F>(default_root: PathBuf, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cloud_name = get(CLOUD_NAME_KEY).ok_or(ConfigError::Missing(CLOUD_NAME_KEY))?;
        let upload_preset = get(UPLOAD_PRESET_KEY).ok_or(ConfigError::Missing(UPLOAD_PRESET_KEY))?;

        let api_url = get(API_URL_KEY)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let root = get(ROOT_KEY).map(PathBuf::from).unwrap_or(default_root);

        let request_timeout_secs = match get(TIMEOUT_KEY) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: TIMEOUT_KEY,
                        value: raw,
                        reason: "must be a positive number of seconds".to_string(),
                    })
                }
            },
            None => DEFAULT_UPLOAD_TIMEOUT_SECS,
        };

        let failure_policy = match get(FAILURE_POLICY_KEY) {
            Some(raw) => raw
                .parse::<FailurePolicy>()
                .map_err(|reason| ConfigError::Invalid {
                    key: FAILURE_POLICY_KEY,
                    value: raw.clone(),
                    reason,
                })?,
            None => FailurePolicy::default(),
        };

        Ok(Self {
            cloud_name: cloud_name.trim().to_string(),
            upload_preset: upload_preset.trim().to_string(),
            api_url,
            layout: SourceLayout::new(root),
            request_timeout_secs,
            failure_policy,
            limits: UploadLimits::default(),
        })
    }

    /// Same config with different size limits.
    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }
}
