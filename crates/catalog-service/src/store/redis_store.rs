//! Redis backend for the document store
//!
//! Data model, per collection `c`:
//! - `c:doc:{id}` → JSON document (id, createdAt, fields)
//! - `c:by_created` → sorted set (score = createdAt in µs, member = id)
//!
//! Members with equal scores sort by id, which matches the `(createdAt, id)`
//! order the page cursors use.
//!
//! Document and index always change together in one MULTI. Updates are
//! compare-and-set: the merged document is written only if the stored JSON
//! is still the one the merge started from, and never once it is deleted.

use anyhow::Context;
use async_trait::async_trait;
use awire_common::{Error, PageCursor, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{now, Collection, Document, DocumentStore, SortOrder};

fn store_error(err: redis::RedisError) -> Error {
    Error::Store(err.to_string())
}

fn doc_key(collection: Collection, id: &str) -> String {
    format!("{}:doc:{}", collection, id)
}

fn index_key(collection: Collection) -> String {
    format!("{}:by_created", collection)
}

/// Attempts before a contended update gives up
const UPDATE_ATTEMPTS: usize = 5;

/// KEYS[1] document, ARGV[1] JSON the merge was based on, ARGV[2] merged JSON.
/// Returns 1 when written, 0 when the document is gone, -1 when it changed.
const COMPARE_AND_SET: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
if current ~= ARGV[1] then
    return -1
end
redis.call('SET', KEYS[1], ARGV[2])
return 1
"#;

/// Document store backed by Redis
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    compare_and_set: Arc<redis::Script>,
}

impl RedisStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            compare_and_set: Arc::new(redis::Script::new(COMPARE_AND_SET)),
        })
    }

    async fn write(&self, collection: Collection, doc: &Document) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(doc)?;

        let _: () = redis::pipe()
            .atomic()
            .set(doc_key(collection, &doc.id), json)
            .ignore()
            .zadd(index_key(collection), &doc.id, doc.created_at.timestamp_micros())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    /// Load documents in the order of `ids`, skipping index entries whose
    /// document is gone
    async fn load(&self, collection: Collection, ids: Vec<String>) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let keys: Vec<String> = ids.iter().map(|id| doc_key(collection, id)).collect();
        let raw: Vec<Option<String>> = conn.mget(&keys).await.map_err(store_error)?;

        let mut docs = Vec::with_capacity(raw.len());
        for (id, json) in ids.iter().zip(raw) {
            match json {
                Some(json) => docs.push(serde_json::from_str(&json)?),
                None => warn!("Index entry without document: {}/{}", collection, id),
            }
        }
        Ok(docs)
    }

    async fn range(
        &self,
        collection: Collection,
        order: SortOrder,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let index = index_key(collection);

        let ids: redis::RedisResult<Vec<String>> = match order {
            SortOrder::Ascending => conn.zrange(index, start, stop).await,
            SortOrder::Descending => conn.zrevrange(index, start, stop).await,
        };
        ids.map_err(store_error)
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn add(&self, collection: Collection, fields: Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let doc = Document::new(id.clone(), now(), fields);
        self.write(collection, &doc).await?;

        debug!("Added {}/{}", collection, id);
        Ok(id)
    }

    async fn list(&self, collection: Collection, order: SortOrder) -> Result<Vec<Document>> {
        let ids = self.range(collection, order, 0, -1).await?;
        self.load(collection, ids).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn
            .get(doc_key(collection, id))
            .await
            .map_err(store_error)?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        // No secondary indexes: scan the collection
        let docs = self.list(collection, SortOrder::Descending).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = doc_key(collection, id);

        for attempt in 1..=UPDATE_ATTEMPTS {
            let current: Option<String> = conn.get(&key).await.map_err(store_error)?;
            let Some(current) = current else {
                return Err(Error::not_found(collection.as_str(), id));
            };

            let mut doc: Document = serde_json::from_str(&current)?;
            doc.merge(fields.clone());
            let merged = serde_json::to_string(&doc)?;

            let outcome: i64 = self
                .compare_and_set
                .key(&key)
                .arg(&current)
                .arg(&merged)
                .invoke_async(&mut conn)
                .await
                .map_err(store_error)?;

            match outcome {
                1 => {
                    debug!("Updated {}/{}", collection, id);
                    return Ok(());
                }
                0 => return Err(Error::not_found(collection.as_str(), id)),
                _ => debug!("{}/{} changed mid-update (attempt {})", collection, id, attempt),
            }
        }

        Err(Error::Store(format!(
            "{}/{} kept changing; update abandoned after {} attempts",
            collection, id, UPDATE_ATTEMPTS
        )))
    }

    async fn set(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<()> {
        let created_at = match self.get(collection, id).await? {
            Some(existing) => existing.created_at,
            None => now(),
        };

        let doc = Document::new(id.to_string(), created_at, fields);
        self.write(collection, &doc).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        let (deleted,): (usize,) = redis::pipe()
            .atomic()
            .del(doc_key(collection, id))
            .zrem(index_key(collection), id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;

        if deleted > 0 {
            info!("Deleted {}/{}", collection, id);
        }
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn.zcard(index_key(collection)).await.map_err(store_error)?;
        Ok(count)
    }

    async fn page(
        &self,
        collection: Collection,
        order: SortOrder,
        limit: usize,
        after: Option<&PageCursor>,
    ) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let span = limit as isize;

        let Some(cursor) = after else {
            let ids = self.range(collection, order, 0, span - 1).await?;
            return self.load(collection, ids).await;
        };

        let mut conn = self.conn.clone();
        let index = index_key(collection);

        let rank: redis::RedisResult<Option<isize>> = match order {
            SortOrder::Ascending => conn.zrank(&index, cursor.id()).await,
            SortOrder::Descending => conn.zrevrank(&index, cursor.id()).await,
        };

        let ids: Vec<String> = match rank.map_err(store_error)? {
            Some(rank) => self.range(collection, order, rank + 1, rank + span).await?,
            None => {
                // The boundary document was deleted; resume from its timestamp.
                // Documents sharing that exact microsecond are skipped.
                let bound = format!("({}", cursor.created_at().timestamp_micros());
                let ids: redis::RedisResult<Vec<String>> = match order {
                    SortOrder::Ascending => {
                        conn.zrangebyscore_limit(&index, bound, "+inf", 0, span).await
                    }
                    SortOrder::Descending => {
                        conn.zrevrangebyscore_limit(&index, bound, "-inf", 0, span).await
                    }
                };
                ids.map_err(store_error)?
            }
        };

        self.load(collection, ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::to_fields;
    use serde_json::json;

    // Needs a local Redis; uses database 15 like the other service tests.
    async fn get_test_store() -> RedisStore {
        RedisStore::connect("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis")
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_add_page_and_delete() {
        let store = get_test_store().await;

        let mut ids = Vec::new();
        for n in 0..3 {
            let fields = to_fields(&json!({ "nome": format!("Foto {}", n) })).unwrap();
            ids.push(store.add(Collection::Photos, fields).await.unwrap());
        }

        let first = store
            .page(Collection::Photos, SortOrder::Descending, 2, None)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, ids[2]);

        let rest = store
            .page(Collection::Photos, SortOrder::Descending, 2, Some(&first[1].cursor()))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, ids[0]);

        for id in &ids {
            store.delete(Collection::Photos, id).await.unwrap();
        }
        assert!(store.get(Collection::Photos, &ids[0]).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_update_never_revives_deleted_document() {
        let store = get_test_store().await;
        let fields = to_fields(&json!({ "nome": "Cocar", "artesaoNome": "Juma" })).unwrap();
        let id = store.add(Collection::CraftItems, fields).await.unwrap();

        store.delete(Collection::CraftItems, &id).await.unwrap();

        let rename = to_fields(&json!({ "artesaoNome": "Juma K." })).unwrap();
        let err = store.update(Collection::CraftItems, &id, rename).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(store.get(Collection::CraftItems, &id).await.unwrap().is_none());

        let listed = store.list(Collection::CraftItems, SortOrder::Descending).await.unwrap();
        assert!(listed.iter().all(|doc| doc.id != id));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_concurrent_updates_keep_both_fields() {
        let store = get_test_store().await;
        let fields = to_fields(&json!({ "nome": "Cocar" })).unwrap();
        let id = store.add(Collection::CraftItems, fields).await.unwrap();

        let (a, b) = tokio::join!(
            store.update(
                Collection::CraftItems,
                &id,
                to_fields(&json!({ "artesaoNome": "Juma K." })).unwrap()
            ),
            store.update(
                Collection::CraftItems,
                &id,
                to_fields(&json!({ "categoria": "Adornos" })).unwrap()
            ),
        );
        a.unwrap();
        b.unwrap();

        let doc = store.get(Collection::CraftItems, &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["artesaoNome"], "Juma K.");
        assert_eq!(doc.fields["categoria"], "Adornos");

        store.delete(Collection::CraftItems, &id).await.unwrap();
    }
}
