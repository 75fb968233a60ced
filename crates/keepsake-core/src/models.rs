//! Domain models: assets, categories and resource kinds.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{DISALLOWED_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Host-side resource type. Picks the upload endpoint variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    /// Video files, and audio, which the host accepts on the video route.
    Video,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
        }
    }

    /// Classify a file extension (without the dot, any case).
    /// Returns `None` for extensions the host is not fed.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(ResourceKind::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(ResourceKind::Image)
        } else {
            None
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest slot an asset lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Timeline,
    FeaturedVideo,
    FeaturedAudio,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Timeline => "timeline",
            Category::FeaturedVideo => "featured-video",
            Category::FeaturedAudio => "featured-audio",
        };
        f.write_str(name)
    }
}

/// A local media file slated for upload. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: PathBuf,
    pub category: Category,
    /// Target folder on the remote host
    pub folder: String,
    /// File name without extension; doubles as the remote public id
    pub id: String,
    pub kind: ResourceKind,
    pub size: u64,
}

impl Asset {
    /// File name as sent in the multipart `file` part.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// Why a discovered file was left out. Not an error: the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DisallowedFormat,
    UnsupportedExtension,
    /// The name can't be used as a remote public id.
    NonUtf8Name,
    OversizedImage { size: u64, limit: u64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DisallowedFormat => f.write_str("disallowed raw image format"),
            SkipReason::UnsupportedExtension => f.write_str("unsupported extension"),
            SkipReason::NonUtf8Name => f.write_str("file name is not valid UTF-8"),
            SkipReason::OversizedImage { limit, .. } => {
                write!(f, "image larger than {}MB", limit / crate::constants::MIB)
            }
        }
    }
}

pub(crate) fn is_disallowed_extension(ext: &str) -> bool {
    DISALLOWED_EXTENSIONS
        .iter()
        .any(|d| d.eq_ignore_ascii_case(ext))
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
