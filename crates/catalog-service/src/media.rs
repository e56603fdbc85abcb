//! Media uploads
//!
//! Files are checked against their upload profile (size cap and MIME
//! allow-list) before anything leaves the process, then posted to the media
//! service, which answers with a public HTTPS URL.

use async_trait::async_trait;
use awire_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

const MB: usize = 1024 * 1024;

const DOCUMENT_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/jpg", "image/png"];

const MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/mov",
    "video/quicktime",
    "video/webm",
    "video/avi",
];

/// Which limits apply to an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadProfile {
    /// Artisan documents: PDF or image, up to 10 MB
    Document,
    /// Gallery and product media: images and videos, up to 100 MB
    Media,
}

impl UploadProfile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "document" | "documento" => Some(UploadProfile::Document),
            "media" | "midia" | "mídia" => Some(UploadProfile::Media),
            _ => None,
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            UploadProfile::Document => 10 * MB,
            UploadProfile::Media => 100 * MB,
        }
    }

    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            UploadProfile::Document => DOCUMENT_TYPES,
            UploadProfile::Media => MEDIA_TYPES,
        }
    }

    /// Destination folder when the caller names none
    pub fn default_folder(&self) -> &'static str {
        match self {
            UploadProfile::Document => "awire",
            UploadProfile::Media => "awire/galeria",
        }
    }

    fn type_hint(&self) -> &'static str {
        match self {
            UploadProfile::Document => "Use PDF, JPG ou PNG.",
            UploadProfile::Media => "Use JPG, PNG, GIF, WEBP, MP4, MOV ou WEBM.",
        }
    }
}

/// A file received from a client
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.data.len() as f64 / MB as f64
    }
}

/// Reject a file the profile does not accept
pub fn validate_upload(profile: UploadProfile, file: &UploadFile) -> Result<()> {
    if file.data.len() > profile.max_bytes() {
        return Err(Error::validation(format!(
            "Arquivo muito grande. Tamanho máximo: {}MB. Tamanho atual: {:.2}MB",
            profile.max_bytes() / MB,
            file.size_mb()
        )));
    }

    let content_type = file.content_type.to_lowercase();
    if !profile.allowed_types().contains(&content_type.as_str()) {
        return Err(Error::validation(format!(
            "Tipo de arquivo não permitido. {}",
            profile.type_hint()
        )));
    }

    Ok(())
}

/// Remote side of an upload
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Store the file under `folder` and return its public URL
    async fn upload(&self, file: &UploadFile, folder: &str, tags: &[String]) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Uploader for Cloudinary's unsigned auto-upload endpoint
pub struct CloudinaryUploader {
    upload_url: String,
    preset: String,
    client: reqwest::Client,
}

impl CloudinaryUploader {
    pub fn new(upload_url: String, preset: String) -> Self {
        Self {
            upload_url,
            preset,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, file: &UploadFile, folder: &str, tags: &[String]) -> Result<String> {
        debug!("Uploading {} ({:.2}MB) to {}", file.file_name, file.size_mb(), folder);

        let part = reqwest::multipart::Part::bytes(file.data.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| Error::Upload(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.preset.clone())
            .text("folder", folder.to_string());
        if !tags.is_empty() {
            form = form.text("tags", tags.join(","));
        }

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!("media service answered {}: {}", status, body)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("Failed to parse upload response: {}", e)))?;

        Ok(uploaded.secure_url)
    }
}

/// Outcome handed back to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<String>> for UploadResult {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(url) => Self {
                success: true,
                url: Some(url),
                error: None,
            },
            Err(e) => Self {
                success: false,
                url: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Validates, then uploads
#[derive(Clone)]
pub struct MediaService {
    uploader: Arc<dyn MediaUploader>,
}

impl MediaService {
    pub fn new(uploader: Arc<dyn MediaUploader>) -> Self {
        Self { uploader }
    }

    pub async fn upload(
        &self,
        profile: UploadProfile,
        file: &UploadFile,
        folder: Option<&str>,
        tags: &[String],
    ) -> Result<String> {
        validate_upload(profile, file)?;

        let folder = folder
            .filter(|folder| !folder.trim().is_empty())
            .unwrap_or(profile.default_folder());

        match self.uploader.upload(file, folder, tags).await {
            Ok(url) => {
                info!("Uploaded {} to {}", file.file_name, url);
                Ok(url)
            }
            Err(e) => {
                error!("Failed to upload {}: {}", file.file_name, e);
                Err(e)
            }
        }
    }
}
