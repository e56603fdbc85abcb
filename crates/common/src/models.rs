//! Catalog entities as stored in the document database.
//!
//! Field names on the wire follow the stored documents (`nome`, `artesaoId`,
//! `createdAt`, ...) so existing collections deserialize unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Maximum number of images attached to a craft item
pub const MAX_IMAGES: usize = 3;

/// A catalog entry representing one handmade product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftItem {
    pub id: String,

    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "descricao", default)]
    pub description: String,

    /// 1 to 3 URLs; the first one is the display image
    pub image_urls: Vec<String>,

    #[serde(rename = "artesaoId")]
    pub artisan_id: String,

    /// Copy of the owning artisan's name, kept in sync on rename
    #[serde(rename = "artesaoNome")]
    pub artisan_name: String,

    #[serde(rename = "categoria")]
    pub category: String,

    #[serde(rename = "aldeia")]
    pub village: String,

    pub created_at: DateTime<Utc>,
}

impl CraftItem {
    /// The display image, if any
    pub fn primary_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

/// Form payload for creating a craft item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCraftItem {
    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "descricao", default)]
    pub description: String,

    pub image_urls: Vec<String>,

    #[serde(rename = "artesaoId")]
    pub artisan_id: String,

    #[serde(rename = "artesaoNome", default)]
    pub artisan_name: String,

    #[serde(rename = "categoria")]
    pub category: String,

    #[serde(rename = "aldeia")]
    pub village: String,
}

impl NewCraftItem {
    /// Check the required form fields
    pub fn validate(&self) -> Result<()> {
        require("nome", &self.name)?;
        require("artesaoId", &self.artisan_id)?;
        require("categoria", &self.category)?;
        require("aldeia", &self.village)?;
        validate_images(&self.image_urls)
    }
}

/// Partial update of a craft item; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftItemUpdate {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,

    #[serde(rename = "artesaoId", skip_serializing_if = "Option::is_none")]
    pub artisan_id: Option<String>,

    #[serde(rename = "artesaoNome", skip_serializing_if = "Option::is_none")]
    pub artisan_name: Option<String>,

    #[serde(rename = "categoria", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(rename = "aldeia", skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
}

impl CraftItemUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require("nome", name)?;
        }
        if let Some(artisan_id) = &self.artisan_id {
            require("artesaoId", artisan_id)?;
        }
        if let Some(urls) = &self.image_urls {
            validate_images(urls)?;
        }
        Ok(())
    }
}

/// A producer profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artisan {
    pub id: String,

    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "fotoUrl", default)]
    pub photo_url: String,

    #[serde(default)]
    pub whatsapp: String,

    #[serde(rename = "aldeia", default)]
    pub village: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Signed consent document
    #[serde(rename = "documentoUrl", default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,

    /// Inactive artisans are hidden from public selection lists
    #[serde(rename = "ativo", default = "default_active")]
    pub active: bool,

    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Form payload for creating an artisan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtisan {
    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "fotoUrl", default)]
    pub photo_url: String,

    #[serde(default)]
    pub whatsapp: String,

    #[serde(rename = "aldeia")]
    pub village: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(rename = "documentoUrl", default, skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,

    #[serde(rename = "ativo", default = "default_active")]
    pub active: bool,
}

impl NewArtisan {
    pub fn validate(&self) -> Result<()> {
        require("nome", &self.name)?;
        require("aldeia", &self.village)
    }
}

/// Partial update of an artisan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanUpdate {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "fotoUrl", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,

    #[serde(rename = "aldeia", skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(rename = "documentoUrl", skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,

    #[serde(rename = "ativo", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl ArtisanUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require("nome", name)?;
        }
        Ok(())
    }
}

/// How a gallery entry should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    const VIDEO_EXTENSIONS: [&'static str; 4] = ["mp4", "mov", "webm", "avi"];

    /// Guess the kind from the file extension of the URL path
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);

        match file.rsplit_once('.') {
            Some((_, ext)) if Self::VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
                MediaKind::Video
            }
            _ => MediaKind::Image,
        }
    }
}

/// A gallery entry (image or video)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,

    pub image_url: String,

    #[serde(rename = "legenda", default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Photo {
    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_url(&self.image_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub image_url: String,

    #[serde(rename = "legenda", default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl NewPhoto {
    pub fn validate(&self) -> Result<()> {
        require("imageUrl", &self.image_url)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(rename = "legenda", skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,

    #[serde(rename = "nome")]
    pub name: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Village {
    pub id: String,

    #[serde(rename = "nome")]
    pub name: String,

    pub created_at: DateTime<Utc>,
}

/// Editable marketing copy, stored as a single record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    #[serde(rename = "textoComoFunciona")]
    pub how_it_works: String,

    #[serde(rename = "textoSobreProjeto")]
    pub about_project: String,
}

/// One line of the admin activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: String,

    #[serde(rename = "acao")]
    pub action: String,

    #[serde(rename = "descricao")]
    pub description: String,

    pub created_at: DateTime<Utc>,
}

/// Uniform outcome of a mutating data-layer call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            id: None,
            error: None,
        }
    }

    pub fn created(id: String) -> Self {
        Self {
            success: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(error.to_string()),
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_images(urls: &[String]) -> Result<()> {
    if urls.is_empty() || urls.len() > MAX_IMAGES {
        return Err(Error::validation(format!(
            "imageUrls must hold between 1 and {} images, got {}",
            MAX_IMAGES,
            urls.len()
        )));
    }
    if urls.iter().any(|url| url.trim().is_empty()) {
        return Err(Error::validation("imageUrls must not contain empty URLs"));
    }
    Ok(())
}
