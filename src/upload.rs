//! Venue image uploads to blob storage.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::BlobConfig;

/// Any reason an upload did not produce a URL. Callers treat all of them alike.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("blob transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("blob storage answered {0}")]
    Rejected(StatusCode),
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Stores the image and returns the URL it can be fetched from.
    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename_hint: &str,
    ) -> Result<String, UploadError>;
}

/// Uploads block blobs with a plain `PUT`, authorised by an optional SAS token.
#[derive(Clone)]
pub struct BlobUploader {
    client: Client,
    account_url: String,
    container: String,
    sas_token: Option<String>,
}

impl BlobUploader {
    pub fn from_config(config: &BlobConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            account_url: config.account_url.trim_end_matches('/').to_string(),
            container: config.container.clone(),
            sas_token: config
                .sas_token
                .as_deref()
                .map(|t| t.trim_start_matches('?').to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    fn blob_url(&self, blob_name: &str) -> String {
        format!("{}/{}/{}", self.account_url, self.container, blob_name)
    }
}

/// Fresh UUID keeping the extension of the uploaded file's name.
fn blob_name(filename_hint: &str) -> String {
    match Path::new(filename_hint).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

#[async_trait]
impl ImageUploader for BlobUploader {
    async fn upload_image(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename_hint: &str,
    ) -> Result<String, UploadError> {
        let url = self.blob_url(&blob_name(filename_hint));
        let target = match &self.sas_token {
            Some(token) => format!("{url}?{token}"),
            None => url.clone(),
        };
        let size = bytes.len();

        let response = self
            .client
            .put(&target)
            .header("x-ms-blob-type", "BlockBlob")
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                error!("blob upload transport error: {:?}", e);
                UploadError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "blob upload rejected");
            return Err(UploadError::Rejected(status));
        }

        info!(%url, size, "image uploaded");
        Ok(url)
    }
}
