//! Dashboard statistics

use awire_common::{Artisan, CraftItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::repository::Catalog;
use crate::store::Collection;

const NO_CATEGORY: &str = "Sem categoria";
const NO_VILLAGE: &str = "Sem aldeia";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub craft_items: usize,
    /// Artisans not switched off
    pub active_artisans: usize,
    pub photos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillageCount {
    pub name: String,
    pub craft_items: usize,
    pub artisans: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub totals: Totals,
    pub by_category: Vec<CategoryCount>,
    pub by_village: Vec<VillageCount>,
}

fn label(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

impl Statistics {
    pub async fn collect(catalog: &Catalog) -> Self {
        let (items, artisans, photos) = tokio::join!(
            catalog.craft_items(),
            catalog.artisans(),
            catalog.count(Collection::Photos),
        );
        Self::compute(&items, &artisans, photos)
    }

    pub fn compute(items: &[CraftItem], artisans: &[Artisan], photos: usize) -> Self {
        let mut categories: HashMap<String, usize> = HashMap::new();
        let mut villages: HashMap<String, (usize, usize)> = HashMap::new();

        for item in items {
            *categories.entry(label(&item.category, NO_CATEGORY)).or_default() += 1;
            villages.entry(label(&item.village, NO_VILLAGE)).or_default().0 += 1;
        }
        for artisan in artisans {
            villages.entry(label(&artisan.village, NO_VILLAGE)).or_default().1 += 1;
        }

        let mut by_category: Vec<CategoryCount> = categories
            .into_iter()
            .map(|(name, value)| CategoryCount { name, value })
            .collect();
        by_category.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));

        let mut by_village: Vec<VillageCount> = villages
            .into_iter()
            .map(|(name, (craft_items, artisans))| VillageCount {
                name,
                craft_items,
                artisans,
            })
            .collect();
        by_village.sort_by(|a, b| {
            b.craft_items
                .cmp(&a.craft_items)
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            totals: Totals {
                craft_items: items.len(),
                active_artisans: artisans.iter().filter(|a| a.active).count(),
                photos,
            },
            by_category,
            by_village,
        }
    }
}
