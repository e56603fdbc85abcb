use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error(
        "Artisan {artisan_id} renamed but {} of {total} craft items were not synchronized",
        .failed.len()
    )]
    CascadeIncomplete {
        artisan_id: String,
        total: usize,
        failed: Vec<String>,
    },

    #[error("Invalid page cursor: {0}")]
    InvalidCursor(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
