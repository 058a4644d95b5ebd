//! Hosted media storage for post images.

use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::Utc;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::info;

use crate::config::CloudinaryConfig;

pub const UPLOAD_FOLDER: &str = "cms-ai-project";
const API_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No image provided.")]
    Empty,

    #[error("The uploaded file is not a supported image.")]
    NotAnImage,

    #[error("Image uploads are not configured.")]
    NotConfigured,

    #[error("media host request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("media host rejected the upload: {0}")]
    Api(String),
}

/// Stores an image and returns the public URL it is served from.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, bytes: &[u8], mime: &str) -> Result<String, MediaError>;
}

/// Checks that `bytes` hold an image and returns its mime type.
pub fn sniff_image(bytes: &[u8]) -> Result<&'static str, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .map_err(|_| MediaError::NotAnImage)
}

#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: UploadErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UploadErrorDetail {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", API_BASE_URL, self.config.cloud_name)
    }
}

/// Signature over the signed upload parameters, sorted by name.
fn sign(folder: &str, timestamp: i64, api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("folder={folder}&timestamp={timestamp}{api_secret}").as_bytes());
    hex::encode(hasher.finalize())
}

fn data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes))
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, bytes: &[u8], mime: &str) -> Result<String, MediaError> {
        let timestamp = Utc::now().timestamp();
        let timestamp_field = timestamp.to_string();
        let signature = sign(UPLOAD_FOLDER, timestamp, &self.config.api_secret);
        let file = data_uri(bytes, mime);

        let response = self
            .http
            .post(self.upload_url())
            .form(&[
                ("file", file.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("timestamp", timestamp_field.as_str()),
                ("folder", UPLOAD_FOLDER),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<UploadErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("status {status}"));
            return Err(MediaError::Api(message));
        }

        let uploaded: UploadResponse =
            serde_json::from_str(&body).map_err(|e| MediaError::Api(e.to_string()))?;

        info!(size = bytes.len(), mime, url = %uploaded.secure_url, "image uploaded");
        Ok(uploaded.secure_url)
    }
}
