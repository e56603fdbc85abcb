//! Client SDK for the AWIRE DIGITAL catalog
//!
//! [`CatalogClient`] wraps the public API; [`CatalogBrowser`] drives the
//! infinite-scroll catalog on top of it.

pub mod browser;
pub mod client;

pub use awire_common::{CatalogFilter, FilteredView, PagerPhase, Selection, Trigger};
pub use browser::CatalogBrowser;
pub use client::{ArtisanProfile, CatalogClient, CraftItemDetail, Gallery};
