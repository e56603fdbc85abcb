//! Client-side catalog filtering
//!
//! Filters run over the craft items already fetched by the pager and never
//! query the store. Until every page is loaded a search can report fewer
//! matches than exist; [`FilteredView::partial`] tells callers when that is
//! the case.

use serde::{Deserialize, Serialize};

use crate::models::CraftItem;

/// A dropdown-style selection: everything, or one exact value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Wire value meaning "no restriction"
    pub const ALL: &'static str = "all";

    /// Parse a select-box value. Empty strings and the localized "todas" /
    /// "todos" used by the site's filters mean [`Selection::All`].
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | Self::ALL | "todas" | "todos" => Selection::All,
            other => Selection::Only(other.to_string()),
        }
    }

    pub fn admits(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        Selection::parse(&value)
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::All => Selection::ALL.to_string(),
            Selection::Only(value) => value,
        }
    }
}

/// Search box plus the category, village and artisan selectors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogFilter {
    pub text: String,
    pub category: Selection,
    pub village: Selection,
    pub artisan_id: Selection,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Selection::parse(category);
        self
    }

    pub fn village(mut self, village: &str) -> Self {
        self.village = Selection::parse(village);
        self
    }

    pub fn artisan(mut self, artisan_id: &str) -> Self {
        self.artisan_id = Selection::parse(artisan_id);
        self
    }

    /// All predicates combined with AND
    pub fn matches(&self, item: &CraftItem) -> bool {
        self.matches_text(&self.text.to_lowercase(), item)
            && self.category.admits(&item.category)
            && self.village.admits(&item.village)
            && self.artisan_id.admits(&item.artisan_id)
    }

    /// Keep the matching items, preserving their order
    pub fn apply(&self, items: &[CraftItem]) -> Vec<CraftItem> {
        let needle = self.text.to_lowercase();

        items
            .iter()
            .filter(|item| {
                self.matches_text(&needle, item)
                    && self.category.admits(&item.category)
                    && self.village.admits(&item.village)
                    && self.artisan_id.admits(&item.artisan_id)
            })
            .cloned()
            .collect()
    }

    fn matches_text(&self, needle: &str, item: &CraftItem) -> bool {
        needle.is_empty()
            || item.name.to_lowercase().contains(needle)
            || item.description.to_lowercase().contains(needle)
            || item.artisan_name.to_lowercase().contains(needle)
    }
}

/// Filter result over a possibly incomplete item list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredView {
    pub items: Vec<CraftItem>,

    /// More pages exist that were not searched
    pub partial: bool,
}
