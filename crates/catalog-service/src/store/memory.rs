//! In-process document store

use async_trait::async_trait;
use awire_common::{Error, PageCursor, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{now, Collection, Document, DocumentStore, SortOrder};

/// Keeps every collection in a map; nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, HashMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document with an explicit creation time
    pub async fn insert(&self, collection: Collection, document: Document) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .insert(document.id.clone(), document);
    }

    async fn sorted(&self, collection: Collection, order: SortOrder) -> Vec<Document> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(&collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();

        docs.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        if order == SortOrder::Descending {
            docs.reverse();
        }
        docs
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: Collection, fields: Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.insert(collection, Document::new(id.clone(), now(), fields))
            .await;

        debug!("Added {}/{}", collection, id);
        Ok(id)
    }

    async fn list(&self, collection: Collection, order: SortOrder) -> Result<Vec<Document>> {
        Ok(self.sorted(collection, order).await)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        let docs = self.sorted(collection, SortOrder::Descending).await;
        Ok(docs
            .into_iter()
            .filter(|doc| doc.fields.get(field) == Some(value))
            .collect())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Error::not_found(collection.as_str(), id))?;

        doc.merge(fields);
        Ok(())
    }

    async fn set(&self, collection: Collection, id: &str, fields: Map<String, Value>) -> Result<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        let created_at = docs.get(id).map(|doc| doc.created_at).unwrap_or_else(now);
        docs.insert(id.to_string(), Document::new(id.to_string(), created_at, fields));
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(&collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(0, HashMap::len))
    }

    async fn page(
        &self,
        collection: Collection,
        order: SortOrder,
        limit: usize,
        after: Option<&PageCursor>,
    ) -> Result<Vec<Document>> {
        let docs = self.sorted(collection, order).await;

        let start = match after {
            None => 0,
            Some(cursor) => {
                let boundary = (cursor.created_at(), cursor.id());
                docs.iter()
                    .position(|doc| match order {
                        SortOrder::Ascending => doc.sort_key() > boundary,
                        SortOrder::Descending => doc.sort_key() < boundary,
                    })
                    .unwrap_or(docs.len())
            }
        };

        Ok(docs.into_iter().skip(start).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::to_fields;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    async fn seeded(count: usize) -> MemoryStore {
        let store = MemoryStore::new();
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        for n in 0..count {
            let artisan = if n % 2 == 0 { "a1" } else { "a2" };
            let fields = to_fields(&json!({ "nome": format!("Peça {}", n), "artesaoId": artisan })).unwrap();
            store
                .insert(
                    Collection::CraftItems,
                    Document::new(format!("doc-{:02}", n), base + Duration::seconds(n as i64), fields),
                )
                .await;
        }
        store
    }

    #[tokio::test]
    async fn test_page_walks_descending() {
        let store = seeded(5).await;

        let first = store
            .page(Collection::CraftItems, SortOrder::Descending, 2, None)
            .await
            .unwrap();
        let ids: Vec<&str> = first.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-04", "doc-03"]);

        let cursor = first.last().unwrap().cursor();
        let second = store
            .page(Collection::CraftItems, SortOrder::Descending, 2, Some(&cursor))
            .await
            .unwrap();
        let ids: Vec<&str> = second.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-02", "doc-01"]);
    }

    #[tokio::test]
    async fn test_page_survives_deleted_cursor() {
        let store = seeded(4).await;
        let cursor = store
            .get(Collection::CraftItems, "doc-02")
            .await
            .unwrap()
            .unwrap()
            .cursor();
        store.delete(Collection::CraftItems, "doc-02").await.unwrap();

        let page = store
            .page(Collection::CraftItems, SortOrder::Descending, 10, Some(&cursor))
            .await
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-01", "doc-00"]);
    }

    #[tokio::test]
    async fn test_find_by_field_and_count() {
        let store = seeded(5).await;
        let found = store
            .find_by_field(Collection::CraftItems, "artesaoId", &json!("a1"))
            .await
            .unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(store.count(Collection::CraftItems).await.unwrap(), 5);
        assert_eq!(store.count(Collection::Photos).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(Collection::Artisans, "ghost", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_preserves_creation_time() {
        let store = MemoryStore::new();
        store
            .set(Collection::Settings, "geral", to_fields(&json!({ "textoComoFunciona": "a" })).unwrap())
            .await
            .unwrap();
        let first = store.get(Collection::Settings, "geral").await.unwrap().unwrap();

        store
            .set(Collection::Settings, "geral", to_fields(&json!({ "textoSobreProjeto": "b" })).unwrap())
            .await
            .unwrap();
        let second = store.get(Collection::Settings, "geral").await.unwrap().unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(!second.fields.contains_key("textoComoFunciona"));
        assert_eq!(second.fields["textoSobreProjeto"], "b");
    }
}
