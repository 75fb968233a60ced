//! Fixed names and limits used by the publisher.

pub const MIB: u64 = 1024 * 1024;

/// Files up to this size go out in one request; larger ones are chunked.
pub const CHUNK_SIZE_BYTES: u64 = 20 * MIB;

/// Images above this size are skipped.
pub const MAX_IMAGE_SIZE_BYTES: u64 = 10 * MIB;

pub const DEFAULT_API_URL: &str = "https://api.cloudinary.com";
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mp3"];
/// Raw camera formats the host can't render; never uploaded.
pub const DISALLOWED_EXTENSIONS: &[&str] = &["heic"];

// Remote folders
pub const TIMELINE_FOLDER: &str = "rewinasworld/timeline-2025";
pub const VIDEOS_FOLDER: &str = "rewinasworld/videos";
pub const MUSIC_FOLDER: &str = "rewinasworld/music";

pub const FEATURED_VIDEO_ID: &str = "bae";
pub const FEATURED_AUDIO_ID: &str = "every-kind-of-way";

// Local layout, relative to the project root
pub const TIMELINE_DIR: &str = "public/timeline-2025";
pub const FEATURED_VIDEO_PATH: &str = "public/videos/bae.mp4";
pub const FEATURED_AUDIO_PATH: &str = "public/music/every-kind-of-way.mp3";
pub const MANIFEST_PATH: &str = "scripts/cloudinary-uploads.json";
