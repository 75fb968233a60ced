//! Upload manifest
//!
//! Maps asset identifiers to the public URLs returned by the media host. The
//! manifest is the only durable output of a run and is written once, after
//! every upload succeeded.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::fs;

use crate::error::ManifestError;
use crate::models::Category;

/// Identifier to URL pairs kept in upload order. Re-recording an identifier
/// replaces its URL in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineUrls(Vec<(String, String)>);

impl TimelineUrls {
    pub fn insert(&mut self, id: String, url: String) -> Option<String> {
        match self.0.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => Some(std::mem::replace(slot, url)),
            None => {
                self.0.push((id, url));
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&String> {
        self.0
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, url)| url)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TimelineUrls {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, url) in &self.0 {
            map.serialize_entry(id, url)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TimelineUrls {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UrlsVisitor;

        impl<'de> Visitor<'de> for UrlsVisitor {
            type Value = TimelineUrls;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of identifiers to URLs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut urls = TimelineUrls::default();
                while let Some((id, url)) = access.next_entry::<String, String>()? {
                    urls.insert(id, url);
                }
                Ok(urls)
            }
        }

        deserializer.deserialize_map(UrlsVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "timeline2025")]
    pub timeline: TimelineUrls,
    #[serde(rename = "baeVideo")]
    pub featured_video: Option<String>,
    #[serde(rename = "music")]
    pub featured_audio: Option<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a URL in the slot for `category`. Returns the URL it replaced, if any.
    pub fn record(&mut self, category: Category, id: &str, url: String) -> Option<String> {
        match category {
            Category::Timeline => self.timeline.insert(id.to_string(), url),
            Category::FeaturedVideo => self.featured_video.replace(url),
            Category::FeaturedAudio => self.featured_audio.replace(url),
        }
    }

    /// Number of URLs recorded.
    pub fn len(&self) -> usize {
        self.timeline.len()
            + usize::from(self.featured_video.is_some())
            + usize::from(self.featured_audio.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_pretty_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the file at `path` with this manifest. The JSON goes to a
    /// sibling temp file first and is renamed into place.
    pub async fn write_atomic(&self, path: &Path) -> Result<(), ManifestError> {
        let json = self.to_pretty_json()?;
        let write_err = |source: std::io::Error| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = tmp_path(path);
        if let Err(e) = fs::write(&tmp, json.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        tracing::debug!(path = %path.display(), entries = self.len(), "Manifest written");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
