//! HTTP client for the media CDN.
//!
//! Uploads local files through the host's unsigned upload endpoint. Files up
//! to the chunk size go out as one multipart request; larger files are sent
//! as sequential byte-range chunks sharing one upload session id. There is no
//! retry: the first failed request fails the whole upload.

pub mod chunk;
pub mod error;

use std::io::SeekFrom;
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use keepsake_core::{Asset, PublisherConfig, ResourceKind};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub use chunk::{ByteRange, ChunkPlan, UploadSession};
pub use error::{UploadError, UploadResult};

const CONTENT_RANGE_HEADER: &str = "Content-Range";
const UPLOAD_ID_HEADER: &str = "X-Unique-Upload-Id";

/// Parsed body of the last successful upload request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    pub secure_url: String,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Anything that can take an asset and hand back its public URL.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, asset: &Asset) -> UploadResult<UploadResponse>;
}

/// Upload client bound to one cloud account and unsigned preset.
#[derive(Clone, Debug)]
pub struct CdnClient {
    client: Client,
    api_url: String,
    cloud_name: String,
    upload_preset: String,
    chunk_size: NonZeroU64,
}

impl CdnClient {
    pub fn new(config: &PublisherConfig) -> UploadResult<Self> {
        let chunk_size =
            NonZeroU64::new(config.limits.chunk_size).ok_or(UploadError::InvalidChunkSize)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(UploadError::Client)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            upload_preset: config.upload_preset.clone(),
            chunk_size,
        })
    }

    /// Upload endpoint for a resource kind.
    pub fn endpoint(&self, kind: ResourceKind) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.api_url, self.cloud_name, kind
        )
    }

    /// Upload one file to `folder/public_id`. Picks the single-request or
    /// chunked path from the file's current size.
    pub async fn upload_file(
        &self,
        path: &Path,
        folder: &str,
        public_id: &str,
        kind: ResourceKind,
    ) -> UploadResult<UploadResponse> {
        let size = fs::metadata(path).await.map_err(io_err(path))?.len();
        let plan = ChunkPlan::new(size, self.chunk_size);

        if plan.is_single() {
            self.upload_single(path, folder, public_id, kind).await
        } else {
            let session = UploadSession::generate();
            self.upload_chunked(path, folder, public_id, kind, plan, &session)
                .await
        }
    }

    async fn upload_single(
        &self,
        path: &Path,
        folder: &str,
        public_id: &str,
        kind: ResourceKind,
    ) -> UploadResult<UploadResponse> {
        let buffer = fs::read(path).await.map_err(io_err(path))?;
        let url = self.endpoint(kind);
        tracing::debug!(file = %path.display(), %url, bytes = buffer.len(), "Uploading in one request");

        let form = self.form(buffer, path, folder, public_id);
        let body = self.send(path, self.client.post(&url).multipart(form)).await?;
        parse_response(path, body)
    }

    /// Send `plan`'s windows in order under `session`. The file handle is
    /// released on every exit path when it goes out of scope.
    pub async fn upload_chunked(
        &self,
        path: &Path,
        folder: &str,
        public_id: &str,
        kind: ResourceKind,
        plan: ChunkPlan,
        session: &UploadSession,
    ) -> UploadResult<UploadResponse> {
        let url = self.endpoint(kind);
        let total = plan.total();
        let mut file = fs::File::open(path).await.map_err(io_err(path))?;
        let mut last = None;

        for range in plan.ranges() {
            file.seek(SeekFrom::Start(range.start))
                .await
                .map_err(io_err(path))?;
            let mut buffer = vec![0u8; range.byte_len() as usize];
            file.read_exact(&mut buffer).await.map_err(io_err(path))?;

            let content_range = range.content_range(total);
            tracing::debug!(
                file = %path.display(),
                range = %content_range,
                %session,
                "Uploading chunk"
            );

            let form = self.form(buffer, path, folder, public_id);
            let request = self
                .client
                .post(&url)
                .header(CONTENT_RANGE_HEADER, content_range)
                .header(UPLOAD_ID_HEADER, session.as_str())
                .multipart(form);
            last = Some(self.send(path, request).await?);
        }

        match last {
            Some(body) => parse_response(path, body),
            None => Err(UploadError::MalformedResponse {
                path: path.to_path_buf(),
                reason: "no chunks were sent".to_string(),
            }),
        }
    }

    fn form(&self, bytes: Vec<u8>, path: &Path, folder: &str, public_id: &str) -> Form {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| public_id.to_string());

        Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", folder.to_string())
            .text("public_id", public_id.to_string())
    }

    /// Send a request and return its JSON body, or `Rejected` on a
    /// non-success status.
    async fn send(&self, path: &Path, request: RequestBuilder) -> UploadResult<serde_json::Value> {
        let response = request.send().await.map_err(|source| UploadError::Request {
            path: path.to_path_buf(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UploadError::Rejected {
                path: path.to_path_buf(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|source| UploadError::Request {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| UploadError::MalformedResponse {
            path: path.to_path_buf(),
            reason: format!("response is not JSON: {}", e),
        })
    }
}

#[async_trait]
impl MediaHost for CdnClient {
    async fn upload(&self, asset: &Asset) -> UploadResult<UploadResponse> {
        self.upload_file(&asset.path, &asset.folder, &asset.id, asset.kind)
            .await
    }
}

fn parse_response(path: &Path, body: serde_json::Value) -> UploadResult<UploadResponse> {
    serde_json::from_value(body).map_err(|e| UploadError::MalformedResponse {
        path: path.to_path_buf(),
        reason: format!("missing secure_url: {}", e),
    })
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> UploadError {
    let path = path.to_path_buf();
    move |source| UploadError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::UploadLimits;
    use mockito::Matcher;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    const CHUNK: u64 = 10;

    fn config(api_url: &str) -> PublisherConfig {
        let api_url = api_url.to_string();
        PublisherConfig::from_lookup(PathBuf::from("."), move |key| match key {
            "CLOUDINARY_CLOUD_NAME" => Some("demo".to_string()),
            "CLOUDINARY_UPLOAD_PRESET" => Some("unsigned".to_string()),
            "CLOUDINARY_API_URL" => Some(api_url.clone()),
            _ => None,
        })
        .unwrap()
        .with_limits(UploadLimits {
            chunk_size: CHUNK,
            max_image_size: CHUNK,
        })
    }

    fn write_file(name: &str, contents: &[u8]) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn form_field(name: &str, value: &str) -> Matcher {
        Matcher::Regex(format!(r#"name="{}"\r\n\r\n{}\r\n"#, name, value))
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let config = config("https://api.example.com").with_limits(UploadLimits {
            chunk_size: 0,
            max_image_size: CHUNK,
        });
        let err = CdnClient::new(&config).unwrap_err();
        assert!(matches!(err, UploadError::InvalidChunkSize));
        assert_eq!(err.kind(), "invalid_chunk_size");
    }

    #[test]
    fn endpoint_uses_resource_kind() {
        let client = CdnClient::new(&config("https://api.example.com/")).unwrap();
        assert_eq!(
            client.endpoint(ResourceKind::Image),
            "https://api.example.com/v1_1/demo/image/upload"
        );
        assert_eq!(
            client.endpoint(ResourceKind::Video),
            "https://api.example.com/v1_1/demo/video/upload"
        );
    }

    #[tokio::test]
    async fn small_file_is_one_request_with_form_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/image/upload")
            .match_header("content-range", Matcher::Missing)
            .match_header("x-unique-upload-id", Matcher::Missing)
            .match_body(Matcher::AllOf(vec![
                form_field("upload_preset", "unsigned"),
                form_field("folder", "rewinasworld/timeline-2025"),
                form_field("public_id", "Jan"),
                Matcher::Regex(r#"filename="Jan.png""#.to_string()),
                Matcher::Regex("0123456789".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"secure_url":"https://cdn.example.com/Jan.png","public_id":"rewinasworld/timeline-2025/Jan","bytes":10}"#)
            .expect(1)
            .create_async()
            .await;

        // Exactly the chunk size still goes out in one request.
        let (_dir, path) = write_file("Jan.png", b"0123456789");
        let client = CdnClient::new(&config(&server.url())).unwrap();

        let response = client
            .upload_file(&path, "rewinasworld/timeline-2025", "Jan", ResourceKind::Image)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.secure_url, "https://cdn.example.com/Jan.png");
        assert_eq!(response.bytes, Some(10));
    }

    #[tokio::test]
    async fn non_success_status_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1_1/demo/image/upload")
            .with_status(400)
            .with_body("Upload preset not found")
            .create_async()
            .await;

        let (_dir, path) = write_file("Jan.png", b"tiny");
        let client = CdnClient::new(&config(&server.url())).unwrap();

        let err = client
            .upload_file(&path, "f", "Jan", ResourceKind::Image)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        match err {
            UploadError::Rejected { body, .. } => assert_eq!(body, "Upload preset not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn response_without_secure_url_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1_1/demo/image/upload")
            .with_status(200)
            .with_body(r#"{"public_id":"Jan"}"#)
            .create_async()
            .await;

        let (_dir, path) = write_file("Jan.png", b"tiny");
        let client = CdnClient::new(&config(&server.url())).unwrap();

        let err = client
            .upload_file(&path, "f", "Jan", ResourceKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn large_file_is_sent_in_ordered_chunks_with_one_session() {
        let mut server = mockito::Server::new_async().await;
        let path_on_host = "/v1_1/demo/video/upload";
        let chunks = [
            ("bytes 0-9/25", "aaaaaaaaaa", r#"{"done":false}"#),
            ("bytes 10-19/25", "bbbbbbbbbb", r#"{"done":false}"#),
            (
                "bytes 20-24/25",
                "ccccc",
                r#"{"secure_url":"https://cdn.example.com/bae.mp4","resource_type":"video"}"#,
            ),
        ];

        let mut mocks = Vec::new();
        for (range, payload, reply) in chunks {
            mocks.push(
                server
                    .mock("POST", path_on_host)
                    .match_header("content-range", range)
                    .match_header("x-unique-upload-id", "session-1")
                    .match_body(Matcher::AllOf(vec![
                        form_field("public_id", "bae"),
                        Matcher::Regex(payload.to_string()),
                    ]))
                    .with_status(200)
                    .with_body(reply)
                    .expect(1)
                    .create_async()
                    .await,
            );
        }

        let (_dir, path) = write_file("bae.mp4", b"aaaaaaaaaabbbbbbbbbbccccc");
        let client = CdnClient::new(&config(&server.url())).unwrap();

        let response = client
            .upload_chunked(
                &path,
                "rewinasworld/videos",
                "bae",
                ResourceKind::Video,
                ChunkPlan::new(25, NonZeroU64::new(CHUNK).unwrap()),
                &UploadSession::from("session-1"),
            )
            .await
            .unwrap();

        for mock in &mocks {
            mock.assert_async().await;
        }
        assert_eq!(response.secure_url, "https://cdn.example.com/bae.mp4");
        assert_eq!(response.resource_type.as_deref(), Some("video"));
    }

    #[tokio::test]
    async fn failed_chunk_stops_the_upload() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/v1_1/demo/video/upload")
            .match_header("content-range", "bytes 0-9/25")
            .with_status(200)
            .with_body(r#"{"done":false}"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/v1_1/demo/video/upload")
            .match_header("content-range", "bytes 10-19/25")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;
        let third = server
            .mock("POST", "/v1_1/demo/video/upload")
            .match_header("content-range", "bytes 20-24/25")
            .with_status(200)
            .with_body(r#"{"secure_url":"https://cdn.example.com/x"}"#)
            .expect(0)
            .create_async()
            .await;

        let (_dir, path) = write_file("bae.mp4", &[7u8; 25]);
        let client = CdnClient::new(&config(&server.url())).unwrap();

        let err = client
            .upload_file(&path, "rewinasworld/videos", "bae", ResourceKind::Video)
            .await
            .unwrap_err();

        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.kind(), "rejected");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let client = CdnClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client
            .upload_file(Path::new("/definitely/not/here.png"), "f", "x", ResourceKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
    }
}
