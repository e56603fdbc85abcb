//! Data access layer
//!
//! One method per entity and operation, translating catalog calls into
//! [`DocumentStore`] requests. Mutations answer with the uniform
//! [`MutationResult`]; list reads degrade to an empty list and single reads
//! to `None` when the store fails. Every failure is logged here, and none is
//! retried.

use async_trait::async_trait;
use awire_common::{
    ActivityLogEntry, Artisan, ArtisanUpdate, Category, CraftItem, CraftItemUpdate, Error,
    MutationResult, NewArtisan, NewCraftItem, NewPhoto, PageCursor, PageSource, Photo, PhotoUpdate,
    Result, SiteConfig, Village,
};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::activity::{ActivityEvent, ActivityOutbox, Subject};
use crate::store::{to_fields, Collection, Document, DocumentStore, SortOrder};

/// Id of the single site-config record
const SITE_CONFIG_ID: &str = "geral";

fn settle(context: &str, result: Result<MutationResult>) -> MutationResult {
    result.unwrap_or_else(|e| {
        error!("Failed to {}: {}", context, e);
        MutationResult::failed(e)
    })
}

fn degrade<T: Default>(context: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        error!("Failed to load {}: {}", context, e);
        T::default()
    })
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>> {
    docs.iter().map(Document::decode).collect()
}

fn name_field(name: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("nome".to_string(), json!(name));
    fields
}

/// Handle to the catalog database; cheap to clone
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
    activity: ActivityOutbox,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>, activity: ActivityOutbox) -> Self {
        Self { store, activity }
    }

    async fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let docs = self.store.list(collection, collection.default_order()).await?;
        decode_all(docs)
    }

    async fn fetch<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        self.store
            .get(collection, id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Human-readable label for the activity feed; falls back to the id
    async fn display_name(&self, collection: Collection, id: &str) -> String {
        let doc = match self.store.get(collection, id).await {
            Ok(Some(doc)) => doc,
            _ => return id.to_string(),
        };

        ["nome", "legenda", "imageUrl"]
            .iter()
            .find_map(|key| doc.fields.get(*key).and_then(Value::as_str))
            .filter(|label| !label.is_empty())
            .unwrap_or(id)
            .to_string()
    }

    /// Documents in a collection, or 0 when the count fails
    pub async fn count(&self, collection: Collection) -> usize {
        degrade(collection.as_str(), self.store.count(collection).await)
    }

    // ===== Craft items =====

    pub async fn add_craft_item(&self, item: &NewCraftItem) -> MutationResult {
        settle("add craft item", self.try_add(Collection::CraftItems, item, Subject::CraftItem, &item.name).await)
    }

    pub async fn craft_items(&self) -> Vec<CraftItem> {
        degrade("craft items", self.list(Collection::CraftItems).await)
    }

    pub async fn craft_item(&self, id: &str) -> Option<CraftItem> {
        degrade("craft item", self.fetch(Collection::CraftItems, id).await)
    }

    pub async fn craft_items_by_artisan(&self, artisan_id: &str) -> Vec<CraftItem> {
        let result = async {
            let docs = self
                .store
                .find_by_field(Collection::CraftItems, "artesaoId", &json!(artisan_id))
                .await?;
            decode_all(docs)
        }
        .await;
        degrade("craft items by artisan", result)
    }

    /// Newest-first page strictly after `after`. Errors propagate so the
    /// pager can keep its state.
    pub async fn craft_items_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<Vec<CraftItem>> {
        let docs = self
            .store
            .page(Collection::CraftItems, SortOrder::Descending, limit, after)
            .await?;
        decode_all(docs)
    }

    pub async fn update_craft_item(&self, id: &str, update: &CraftItemUpdate) -> MutationResult {
        settle(
            "update craft item",
            self.try_update(Collection::CraftItems, id, update, Subject::CraftItem, update.name.as_deref())
                .await,
        )
    }

    pub async fn delete_craft_item(&self, id: &str) -> MutationResult {
        settle("delete craft item", self.try_delete(Collection::CraftItems, id, Subject::CraftItem).await)
    }

    // ===== Artisans =====

    pub async fn add_artisan(&self, artisan: &NewArtisan) -> MutationResult {
        settle("add artisan", self.try_add(Collection::Artisans, artisan, Subject::Artisan, &artisan.name).await)
    }

    /// Every artisan, including inactive ones
    pub async fn artisans(&self) -> Vec<Artisan> {
        degrade("artisans", self.list(Collection::Artisans).await)
    }

    /// Artisans offered in public selection lists
    pub async fn active_artisans(&self) -> Vec<Artisan> {
        self.artisans()
            .await
            .into_iter()
            .filter(|artisan| artisan.active)
            .collect()
    }

    pub async fn artisan(&self, id: &str) -> Option<Artisan> {
        degrade("artisan", self.fetch(Collection::Artisans, id).await)
    }

    /// Update an artisan and, when the update changes the name, copy it onto
    /// every craft item the artisan owns.
    ///
    /// The rename is not rolled back if some craft items fail to update; the
    /// result then names how many were left behind.
    pub async fn update_artisan(&self, id: &str, update: &ArtisanUpdate) -> MutationResult {
        let result = async {
            let previous = match &update.name {
                Some(_) => self.fetch::<Artisan>(Collection::Artisans, id).await?,
                None => None,
            };
            let renamed = update
                .name
                .as_ref()
                .filter(|name| previous.as_ref().is_some_and(|artisan| &artisan.name != *name));

            self.store
                .update(Collection::Artisans, id, to_fields(update)?)
                .await?;

            let label = match &update.name {
                Some(name) => name.clone(),
                None => self.display_name(Collection::Artisans, id).await,
            };
            self.activity.record(ActivityEvent::Updated {
                subject: Subject::Artisan,
                name: label,
            });

            if let Some(name) = renamed {
                let items = self.sync_artisan_name(id, name).await?;
                self.activity.record(ActivityEvent::ArtisanNameSynced {
                    name: name.clone(),
                    items,
                });
            }
            Ok::<_, Error>(MutationResult::ok())
        }
        .await;
        settle("update artisan", result)
    }

    /// Write `name` into `artesaoNome` of every craft item owned by the
    /// artisan. Updates run concurrently; returns how many were written.
    pub async fn sync_artisan_name(&self, artisan_id: &str, name: &str) -> Result<usize> {
        let items = self
            .store
            .find_by_field(Collection::CraftItems, "artesaoId", &json!(artisan_id))
            .await?;

        let updates = items.iter().map(|doc| {
            let mut fields = Map::new();
            fields.insert("artesaoNome".to_string(), json!(name));
            self.store.update(Collection::CraftItems, &doc.id, fields)
        });
        let results = join_all(updates).await;

        let failed: Vec<String> = items
            .iter()
            .zip(results)
            .filter_map(|(doc, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    warn!("Craft item {} kept a stale artisan name: {}", doc.id, e);
                    Some(doc.id.clone())
                }
            })
            .collect();

        if !failed.is_empty() {
            return Err(Error::CascadeIncomplete {
                artisan_id: artisan_id.to_string(),
                total: items.len(),
                failed,
            });
        }

        info!("Synchronized artisan name on {} craft items", items.len());
        Ok(items.len())
    }

    /// Removes only the artisan; their craft items stay, still carrying the
    /// artisan's id and name.
    pub async fn delete_artisan(&self, id: &str) -> MutationResult {
        settle("delete artisan", self.try_delete(Collection::Artisans, id, Subject::Artisan).await)
    }

    // ===== Photos =====

    pub async fn add_photo(&self, photo: &NewPhoto) -> MutationResult {
        let label = photo.caption.as_deref().unwrap_or(&photo.image_url);
        settle("add photo", self.try_add(Collection::Photos, photo, Subject::Photo, label).await)
    }

    pub async fn photos(&self) -> Vec<Photo> {
        degrade("photos", self.list(Collection::Photos).await)
    }

    pub async fn photo(&self, id: &str) -> Option<Photo> {
        degrade("photo", self.fetch(Collection::Photos, id).await)
    }

    pub async fn photos_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<Vec<Photo>> {
        let docs = self
            .store
            .page(Collection::Photos, SortOrder::Descending, limit, after)
            .await?;
        decode_all(docs)
    }

    pub async fn update_photo(&self, id: &str, update: &PhotoUpdate) -> MutationResult {
        settle(
            "update photo",
            self.try_update(Collection::Photos, id, update, Subject::Photo, update.caption.as_deref())
                .await,
        )
    }

    pub async fn delete_photo(&self, id: &str) -> MutationResult {
        settle("delete photo", self.try_delete(Collection::Photos, id, Subject::Photo).await)
    }

    // ===== Categories and villages =====

    pub async fn categories(&self) -> Vec<Category> {
        degrade("categories", self.list(Collection::Categories).await)
    }

    pub async fn add_category(&self, name: &str) -> MutationResult {
        settle("add category", self.try_add_named(Collection::Categories, name).await)
    }

    /// Existing craft items keep the old category name
    pub async fn update_category(&self, id: &str, name: &str) -> MutationResult {
        settle("update category", self.try_rename(Collection::Categories, id, name).await)
    }

    pub async fn delete_category(&self, id: &str) -> MutationResult {
        settle("delete category", self.try_remove(Collection::Categories, id).await)
    }

    pub async fn villages(&self) -> Vec<Village> {
        degrade("villages", self.list(Collection::Villages).await)
    }

    pub async fn add_village(&self, name: &str) -> MutationResult {
        settle("add village", self.try_add_named(Collection::Villages, name).await)
    }

    /// Existing craft items and artisans keep the old village name
    pub async fn update_village(&self, id: &str, name: &str) -> MutationResult {
        settle("update village", self.try_rename(Collection::Villages, id, name).await)
    }

    pub async fn delete_village(&self, id: &str) -> MutationResult {
        settle("delete village", self.try_remove(Collection::Villages, id).await)
    }

    // ===== Site config and activity =====

    pub async fn site_config(&self) -> Option<SiteConfig> {
        degrade("site config", self.fetch(Collection::Settings, SITE_CONFIG_ID).await)
    }

    pub async fn save_site_config(&self, config: &SiteConfig) -> MutationResult {
        let result = async {
            self.store
                .set(Collection::Settings, SITE_CONFIG_ID, to_fields(config)?)
                .await?;
            Ok::<_, Error>(MutationResult::ok())
        }
        .await;
        settle("save site config", result)
    }

    /// The `limit` most recent activity entries
    pub async fn recent_activity(&self, limit: usize) -> Vec<ActivityLogEntry> {
        let result = async {
            let docs = self
                .store
                .page(Collection::ActivityLog, SortOrder::Descending, limit, None)
                .await?;
            decode_all(docs)
        }
        .await;
        degrade("activity log", result)
    }

    // ===== Shared mutation paths =====

    async fn try_add<T: serde::Serialize>(
        &self,
        collection: Collection,
        payload: &T,
        subject: Subject,
        label: &str,
    ) -> Result<MutationResult> {
        let id = self.store.add(collection, to_fields(payload)?).await?;
        self.activity.record(ActivityEvent::Created {
            subject,
            name: label.to_string(),
        });
        Ok(MutationResult::created(id))
    }

    async fn try_update<T: serde::Serialize>(
        &self,
        collection: Collection,
        id: &str,
        update: &T,
        subject: Subject,
        label: Option<&str>,
    ) -> Result<MutationResult> {
        self.store.update(collection, id, to_fields(update)?).await?;

        let name = match label {
            Some(label) => label.to_string(),
            None => self.display_name(collection, id).await,
        };
        self.activity.record(ActivityEvent::Updated { subject, name });
        Ok(MutationResult::ok())
    }

    async fn try_delete(&self, collection: Collection, id: &str, subject: Subject) -> Result<MutationResult> {
        let name = self.display_name(collection, id).await;
        self.store.delete(collection, id).await?;
        self.activity.record(ActivityEvent::Deleted { subject, name });
        Ok(MutationResult::ok())
    }

    async fn try_add_named(&self, collection: Collection, name: &str) -> Result<MutationResult> {
        let id = self.store.add(collection, name_field(name)).await?;
        Ok(MutationResult::created(id))
    }

    async fn try_rename(&self, collection: Collection, id: &str, name: &str) -> Result<MutationResult> {
        self.store.update(collection, id, name_field(name)).await?;
        Ok(MutationResult::ok())
    }

    async fn try_remove(&self, collection: Collection, id: &str) -> Result<MutationResult> {
        self.store.delete(collection, id).await?;
        Ok(MutationResult::ok())
    }
}

#[async_trait]
impl PageSource for Catalog {
    type Item = CraftItem;

    async fn fetch_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<Vec<CraftItem>> {
        self.craft_items_page(limit, after).await
    }
}
