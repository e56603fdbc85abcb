//! Infinite-scroll catalog session
//!
//! Owns the pager and the active filter for one visitor. Triggers from the
//! scroll sentinel and the "load more" button funnel into the same pager, so
//! overlapping triggers never fetch the same page twice.

use awire_common::{CatalogFilter, CraftItem, FilteredView, PagerPhase, Result, SharedPager, Trigger};
use tracing::info;

use crate::client::CatalogClient;

pub struct CatalogBrowser {
    client: CatalogClient,
    pager: SharedPager<CraftItem>,
    filter: CatalogFilter,
}

impl CatalogBrowser {
    pub fn new(client: CatalogClient, page_size: usize) -> Self {
        Self {
            client,
            pager: SharedPager::new(page_size),
            filter: CatalogFilter::new(),
        }
    }

    /// Load the first page, dropping anything loaded before
    pub async fn open(&self) -> Result<usize> {
        let loaded = self.pager.load_initial_page(&self.client).await?;
        info!("Catalog opened with {} items", loaded);
        Ok(loaded)
    }

    /// React to the sentinel or the button; 0 when nothing was fetched
    pub async fn on_trigger(&self, trigger: Trigger) -> Result<usize> {
        self.pager.load_next_page(&self.client, trigger).await
    }

    /// Keep loading until the catalog is exhausted; returns the items held.
    /// A fetch started by another trigger is awaited rather than raced.
    pub async fn load_all(&self) -> Result<usize> {
        loop {
            self.pager.settled().await;
            if !self.pager.inspect(|pager| pager.has_more()).await {
                break;
            }
            self.on_trigger(Trigger::LoadMoreClicked).await?;
        }
        Ok(self.loaded().await)
    }

    /// Replace the filter; loaded pages are kept
    pub fn set_filter(&mut self, filter: CatalogFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &CatalogFilter {
        &self.filter
    }

    /// Matches among the loaded items
    pub async fn view(&self) -> FilteredView {
        self.pager.inspect(|pager| pager.filtered(&self.filter)).await
    }

    pub async fn phase(&self) -> PagerPhase {
        self.pager.inspect(|pager| pager.phase()).await
    }

    pub async fn loaded(&self) -> usize {
        self.pager.inspect(|pager| pager.items().len()).await
    }
}
