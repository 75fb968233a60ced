//! Publish pipeline
//!
//! Runs discovery and upload for each category in a fixed order (timeline,
//! featured video, featured audio) and writes the manifest once at the end.
//! Nothing is written unless every attempted upload succeeded.

use std::fmt::Write as _;
use std::path::PathBuf;

use keepsake_cdn_client::{MediaHost, UploadError};
use keepsake_core::constants::{FEATURED_AUDIO_ID, FEATURED_VIDEO_ID, MUSIC_FOLDER, VIDEOS_FOLDER};
use keepsake_core::{
    featured_asset, scan_timeline, Asset, Category, DiscoveryError, FailurePolicy, Manifest,
    ManifestError, PublisherConfig, ResourceKind, SkippedFile,
};

/// Result of one upload attempt.
#[derive(Debug)]
pub enum AssetOutcome {
    Uploaded { url: String },
    Failed(AssetFailure),
}

/// An asset whose upload failed, with the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("Failed to upload {} asset '{}'", .asset.category, .asset.id)]
pub struct AssetFailure {
    pub asset: Asset,
    #[source]
    pub error: UploadError,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// First failure under [`FailurePolicy::AbortOnFirst`].
    #[error(transparent)]
    Upload(Box<AssetFailure>),

    /// Every failure under [`FailurePolicy::CollectAll`].
    #[error("{} upload(s) failed: {}", .0.len(), summarize(.0))]
    Failed(Vec<AssetFailure>),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

fn summarize(failures: &[AssetFailure]) -> String {
    let mut out = String::new();
    for (i, failure) in failures.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{}: {}", failure.asset.id, failure.error);
    }
    out
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub uploaded: usize,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Default)]
struct RunState {
    manifest: Manifest,
    uploaded: usize,
    failures: Vec<AssetFailure>,
}

/// Drives one publishing run against a media host.
pub struct Publisher<'a> {
    config: &'a PublisherConfig,
    host: &'a dyn MediaHost,
}

impl<'a> Publisher<'a> {
    pub fn new(config: &'a PublisherConfig, host: &'a dyn MediaHost) -> Self {
        Self { config, host }
    }

    pub async fn run(&self) -> Result<PublishReport, PublishError> {
        let layout = &self.config.layout;
        let mut state = RunState::default();

        let timeline = scan_timeline(&layout.timeline_dir(), &self.config.limits).await?;
        for asset in &timeline.assets {
            self.publish_asset(asset, &mut state).await?;
        }

        let featured = [
            (
                layout.featured_video(),
                Category::FeaturedVideo,
                VIDEOS_FOLDER,
                FEATURED_VIDEO_ID,
            ),
            (
                layout.featured_audio(),
                Category::FeaturedAudio,
                MUSIC_FOLDER,
                FEATURED_AUDIO_ID,
            ),
        ];
        for (path, category, folder, id) in featured {
            // Audio goes through the video endpoint as well.
            if let Some(asset) =
                featured_asset(&path, category, folder, id, ResourceKind::Video).await?
            {
                self.publish_asset(&asset, &mut state).await?;
            }
        }

        if !state.failures.is_empty() {
            return Err(PublishError::Failed(state.failures));
        }

        let manifest_path = layout.manifest();
        state.manifest.write_atomic(&manifest_path).await?;
        tracing::info!("Saved {}", manifest_path.display());
        tracing::info!(
            uploaded = state.uploaded,
            skipped = timeline.skipped.len(),
            "Publish complete"
        );

        Ok(PublishReport {
            manifest: state.manifest,
            manifest_path,
            uploaded: state.uploaded,
            skipped: timeline.skipped,
        })
    }

    /// Upload one asset and report the outcome without deciding what a
    /// failure means for the run.
    pub async fn upload_asset(&self, asset: &Asset) -> AssetOutcome {
        match self.host.upload(asset).await {
            Ok(response) => AssetOutcome::Uploaded {
                url: response.secure_url,
            },
            Err(error) => AssetOutcome::Failed(AssetFailure {
                asset: asset.clone(),
                error,
            }),
        }
    }

    async fn publish_asset(&self, asset: &Asset, state: &mut RunState) -> Result<(), PublishError> {
        match self.upload_asset(asset).await {
            AssetOutcome::Uploaded { url } => {
                tracing::info!("Uploaded {} -> {}", asset.file_name(), url);
                if let Some(previous) = state.manifest.record(asset.category, &asset.id, url) {
                    tracing::warn!(
                        id = %asset.id,
                        %previous,
                        "Duplicate identifier, keeping the latest upload"
                    );
                }
                state.uploaded += 1;
                Ok(())
            }
            AssetOutcome::Failed(failure) => match self.config.failure_policy {
                FailurePolicy::AbortOnFirst => Err(PublishError::Upload(Box::new(failure))),
                FailurePolicy::CollectAll => {
                    tracing::warn!(
                        id = %asset.id,
                        kind = failure.error.kind(),
                        "Upload failed, continuing with remaining assets"
                    );
                    state.failures.push(failure);
                    Ok(())
                }
            },
        }
    }
}
