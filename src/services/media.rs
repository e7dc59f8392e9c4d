use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::error::ApiError;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("image upload failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upload response did not include a secure url")]
    MissingUrl,
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

/// A file received in a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize, Debug)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// Uploads images to Cloudinary through an unsigned upload preset.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: &str, upload_preset: &str, timeout: Duration) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            upload_url: format!("https://api.cloudinary.com/v1_1/{}/image/upload", cloud_name),
            upload_preset: upload_preset.to_string(),
        })
    }

    /// Returns the https URL of the stored image.
    pub async fn upload(&self, image: ImageUpload) -> Result<String, MediaError> {
        let mut part = Part::bytes(image.bytes).file_name(image.file_name);
        if let Some(content_type) = image.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json::<UploadResponse>()
            .await?;

        let url = response.secure_url.ok_or(MediaError::MissingUrl)?;
        log::info!("Uploaded image to {}", url);
        Ok(url)
    }
}
