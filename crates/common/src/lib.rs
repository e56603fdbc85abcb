//! Shared types for the AWIRE DIGITAL catalog.
//!
//! Holds the entity models, the error type, and the client-side catalog
//! engine (cursor pager and multi-field filter) used by both the service
//! and the SDK.

pub mod error;
pub mod filter;
pub mod models;
pub mod pagination;

pub use error::{Error, Result};
pub use filter::{CatalogFilter, FilteredView, Selection};
pub use models::{
    ActivityLogEntry, Artisan, ArtisanUpdate, Category, CraftItem, CraftItemUpdate, MediaKind,
    MutationResult, NewArtisan, NewCraftItem, NewPhoto, Photo, PhotoUpdate, SiteConfig, Village,
};
pub use pagination::{
    CatalogPager, PageCursor, PageRequest, PageResponse, PageSource, PagerPhase, Paged, SharedPager,
    Trigger,
};
