//! Document database contract
//!
//! The catalog only ever talks to its database through [`DocumentStore`]:
//! collection-scoped CRUD, creation-time ordering, field equality lookups,
//! counts, and cursor pagination. Two backends implement it: Redis for
//! deployments and an in-memory map for development and tests.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use awire_common::{PageCursor, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Collections of the catalog database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    CraftItems,
    Artisans,
    Photos,
    Categories,
    Villages,
    Settings,
    ActivityLog,
}

impl Collection {
    /// Name of the collection in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::CraftItems => "artesanatos",
            Collection::Artisans => "artesaos",
            Collection::Photos => "fotos",
            Collection::Categories => "categorias",
            Collection::Villages => "aldeias",
            Collection::Settings => "configuracoes",
            Collection::ActivityLog => "logs",
        }
    }

    /// Reference lists read oldest first, content lists newest first
    pub fn default_order(&self) -> SortOrder {
        match self {
            Collection::Categories | Collection::Villages => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A stored document: id and creation time plus free-form fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,

    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: String, created_at: DateTime<Utc>, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        fields.remove("createdAt");
        Self {
            id,
            created_at,
            fields,
        }
    }

    /// Decode into a typed entity
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Shallow merge, as a document-database partial update does
    pub fn merge(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            if key == "id" || key == "createdAt" {
                continue;
            }
            self.fields.insert(key, value);
        }
    }

    pub fn cursor(&self) -> PageCursor {
        PageCursor::new(self.id.clone(), self.created_at)
    }

    /// Position in ascending creation order
    pub(crate) fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, self.id.as_str())
    }
}

/// Serialize a payload struct into document fields
pub fn to_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(awire_common::Error::validation(format!(
            "expected an object payload, got {}",
            other
        ))),
    }
}

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Creation timestamp at the precision page cursors carry.
/// Strictly increasing within the process, so documents created back to
/// back keep their insertion order.
pub fn now() -> DateTime<Utc> {
    let wall = Utc::now().timestamp_micros();
    let mut last = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let next = wall.max(last + 1);
        match LAST_TIMESTAMP.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
            Err(current) => last = current,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document with a generated id, returning that id
    async fn add(&self, collection: Collection, fields: Map<String, Value>) -> Result<String>;

    /// Every document of a collection in creation order
    async fn list(&self, collection: Collection, order: SortOrder) -> Result<Vec<Document>>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;

    /// Documents whose `field` equals `value`, newest first
    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>>;

    /// Merge fields into an existing document; `NotFound` if it is missing
    async fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Create or replace the document stored under a fixed id
    async fn set(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Remove a document; deleting a missing id is not an error
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    async fn count(&self, collection: Collection) -> Result<usize>;

    /// Up to `limit` documents strictly after `after` in the given order
    async fn page(
        &self,
        collection: Collection,
        order: SortOrder,
        limit: usize,
        after: Option<&PageCursor>,
    ) -> Result<Vec<Document>>;
}
