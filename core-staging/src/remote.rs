//! # Song Catalog Client
//!
//! The remote side of the staging engine: the song API that owns the
//! collection, the singer list and the lyric text storage.
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | Fetch collection | `GET {base}/api/songs` |
//! | Commit diffs | `POST {base}/api/songs` with `{ songs, event_title }` |
//! | Singer list | `GET {base}/api/getAllSingers` |
//! | Lyric upload | `POST {base}/api/songTxt` with `{ filename, text }` |
//!
//! Failures report `{ "message": "..." }`; that message is carried in
//! [`StagingError::Remote`].

use crate::error::{Result, StagingError};
use crate::lyrics::blob_pathname;
use crate::models::{BaselineSnapshot, CommitRequest, TextUpload, UploadReceipt};
use async_trait::async_trait;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

const SONGS_PATH: &str = "api/songs";
const SINGERS_PATH: &str = "api/getAllSingers";
const SONG_TEXT_PATH: &str = "api/songTxt";

/// Remote song collection.
#[async_trait]
pub trait SongCatalog: Send + Sync {
    /// Current server-side collection and event metadata.
    async fn fetch_collection(&self) -> Result<BaselineSnapshot>;

    /// Submit staged diffs. Success means the server accepted all of them.
    async fn commit(&self, request: &CommitRequest) -> Result<()>;

    async fn fetch_singers(&self) -> Result<Vec<String>>;

    async fn upload_text(&self, upload: &TextUpload) -> Result<UploadReceipt>;
}

#[cfg(test)]
mockall::mock! {
    pub Catalog {}

    #[async_trait]
    impl SongCatalog for Catalog {
        async fn fetch_collection(&self) -> Result<BaselineSnapshot>;
        async fn commit(&self, request: &CommitRequest) -> Result<()>;
        async fn fetch_singers(&self) -> Result<Vec<String>>;
        async fn upload_text(&self, upload: &TextUpload) -> Result<UploadReceipt>;
    }
}

/// The singer endpoint has returned both plain names and `{ name }` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum SingerName {
    Plain(String),
    Entry { name: String },
}

#[derive(Deserialize)]
struct SingersBody {
    #[serde(default)]
    names: Vec<SingerName>,
}

#[derive(Deserialize, Default)]
struct UploadBody {
    #[serde(default)]
    result: Option<UploadResult>,
}

#[derive(Deserialize)]
struct UploadResult {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    pathname: Option<String>,
}

/// [`SongCatalog`] over the host [`HttpClient`].
pub struct HttpSongCatalog {
    client: Arc<dyn HttpClient>,
    base_url: Url,
    retry_policy: RetryPolicy,
    timeout: Option<Duration>,
}

impl HttpSongCatalog {
    /// `base_url` is treated as a directory: API paths are joined beneath
    /// its last path segment.
    pub fn new(client: Arc<dyn HttpClient>, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client,
            base_url,
            retry_policy: RetryPolicy::default(),
            timeout: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn url(&self, path: &str) -> Result<String> {
        self.base_url
            .join(path)
            .map(String::from)
            .map_err(|e| StagingError::invalid_input("url", e.to_string()))
    }

    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let url = request.url.clone();
        let response = self
            .client
            .execute_with_retry(request, self.retry_policy.clone())
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "Song API unreachable");
                StagingError::Remote {
                    status: 0,
                    message: e.to_string(),
                }
            })?;

        if !response.is_success() {
            let message = response
                .message()
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            warn!(%url, status = response.status, %message, "Song API rejected request");
            return Err(StagingError::Remote {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl SongCatalog for HttpSongCatalog {
    #[instrument(skip(self))]
    async fn fetch_collection(&self) -> Result<BaselineSnapshot> {
        let response = self.send(HttpRequest::get(self.url(SONGS_PATH)?)).await?;
        let snapshot: BaselineSnapshot = serde_json::from_slice(&response.body)?;

        debug!(songs = snapshot.songs.len(), "Fetched song collection");
        Ok(snapshot)
    }

    #[instrument(skip(self, request), fields(songs = request.songs.len()))]
    async fn commit(&self, request: &CommitRequest) -> Result<()> {
        let http_request = HttpRequest::post(self.url(SONGS_PATH)?).json(request)?;
        self.send(http_request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_singers(&self) -> Result<Vec<String>> {
        let response = self.send(HttpRequest::get(self.url(SINGERS_PATH)?)).await?;
        let body: SingersBody = serde_json::from_slice(&response.body)?;

        Ok(body
            .names
            .into_iter()
            .map(|entry| match entry {
                SingerName::Plain(name) | SingerName::Entry { name } => name,
            })
            .collect())
    }

    #[instrument(skip(self, upload), fields(filename = %upload.filename))]
    async fn upload_text(&self, upload: &TextUpload) -> Result<UploadReceipt> {
        let http_request = HttpRequest::post(self.url(SONG_TEXT_PATH)?).json(upload)?;
        let response = self.send(http_request).await?;

        // The body is informational; an unreadable one still means success
        let body: UploadBody = serde_json::from_slice(&response.body).unwrap_or_default();
        let result = body.result;

        Ok(UploadReceipt {
            pathname: result
                .as_ref()
                .and_then(|r| r.pathname.clone())
                .unwrap_or_else(|| blob_pathname(&upload.filename)),
            url: result.and_then(|r| r.url),
        })
    }
}
