//! Lyric text upload.
//!
//! Lyrics live in blob storage next to the song collection, not in the
//! staged records. Uploading is independent of staging and commits.

use crate::error::{Result, StagingError};
use crate::models::{TextUpload, UploadReceipt};
use crate::remote::SongCatalog;
use std::sync::Arc;
use tracing::{info, instrument};

/// Replace every character outside `[A-Za-z0-9-_.]` with `_`.
pub fn sanitize_blob_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Blob path a lyric upload is stored under.
pub fn blob_pathname(filename: &str) -> String {
    format!("txt/{}.txt", sanitize_blob_name(filename))
}

pub struct LyricsUploader {
    catalog: Arc<dyn SongCatalog>,
}

impl LyricsUploader {
    pub fn new(catalog: Arc<dyn SongCatalog>) -> Self {
        Self { catalog }
    }

    /// Upload lyric text under `filename`.
    ///
    /// # Errors
    ///
    /// `StagingError::InvalidInput` when either argument is empty, otherwise
    /// whatever the catalog reports.
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub async fn upload(&self, filename: &str, text: &str) -> Result<UploadReceipt> {
        if filename.is_empty() {
            return Err(StagingError::invalid_input("filename", "filename is required"));
        }
        if text.is_empty() {
            return Err(StagingError::invalid_input("text", "text is required"));
        }

        let receipt = self
            .catalog
            .upload_text(&TextUpload {
                filename: filename.to_string(),
                text: text.to_string(),
            })
            .await?;

        info!(pathname = %receipt.pathname, "Uploaded lyric text");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockCatalog;
    use mockall::predicate::function;

    #[test]
    fn test_sanitize_blob_name() {
        assert_eq!(sanitize_blob_name("Amazing Grace"), "Amazing_Grace");
        assert_eq!(sanitize_blob_name("a-b_c.d"), "a-b_c.d");
        assert_eq!(sanitize_blob_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_blob_name("Café!"), "Caf__");
        assert_eq!(blob_pathname("10,000 Reasons"), "txt/10_000_Reasons.txt");
    }

    #[tokio::test]
    async fn test_upload_requires_filename_and_text() {
        let mut catalog = MockCatalog::new();
        catalog.expect_upload_text().never();
        let uploader = LyricsUploader::new(Arc::new(catalog));

        assert!(matches!(
            uploader.upload("", "Verse").await,
            Err(StagingError::InvalidInput { field, .. }) if field == "filename"
        ));
        assert!(matches!(
            uploader.upload("grace", "").await,
            Err(StagingError::InvalidInput { field, .. }) if field == "text"
        ));
    }

    #[tokio::test]
    async fn test_upload_forwards_to_catalog() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_upload_text()
            .with(function(|upload: &TextUpload| {
                upload.filename == "grace" && upload.text == "Amazing grace"
            }))
            .times(1)
            .returning(|upload| {
                Ok(UploadReceipt {
                    pathname: blob_pathname(&upload.filename),
                    url: None,
                })
            });
        let uploader = LyricsUploader::new(Arc::new(catalog));

        let receipt = uploader.upload("grace", "Amazing grace").await.unwrap();
        assert_eq!(receipt.pathname, "txt/grace.txt");
    }

    #[tokio::test]
    async fn test_upload_surfaces_remote_errors() {
        let mut catalog = MockCatalog::new();
        catalog.expect_upload_text().returning(|_| {
            Err(StagingError::Remote {
                status: 500,
                message: "Upload failed".into(),
            })
        });
        let uploader = LyricsUploader::new(Arc::new(catalog));

        assert!(matches!(
            uploader.upload("grace", "text").await,
            Err(StagingError::Remote { status: 500, .. })
        ));
    }
}
