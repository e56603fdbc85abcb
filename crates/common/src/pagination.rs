//! Cursor pager for the infinite-scroll catalog
//!
//! The pager accumulates pages fetched from a [`PageSource`] into one list.
//! `has_more` is inferred from page fullness, so a collection whose size is
//! an exact multiple of the page size costs one extra, empty fetch before the
//! pager reports [`PagerPhase::Exhausted`].
//!
//! Phases: `Idle -> LoadingInitial -> Ready <-> LoadingMore -> ... -> Exhausted`.
//! A failed fetch never leaves the pager stuck: the loading flag is cleared
//! and `has_more` keeps its previous value so the caller can trigger again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::error::{Error, Result};
use crate::filter::{CatalogFilter, FilteredView};
use crate::models::{CraftItem, Photo};

/// Opaque page boundary: the last item of the previous page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageCursor {
    id: String,
    created_at: DateTime<Utc>,
}

impl PageCursor {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Token handed to clients, `<micros>.<id>`
    pub fn to_token(&self) -> String {
        format!("{}.{}", self.created_at.timestamp_micros(), self.id)
    }

    pub fn from_token(token: &str) -> Result<Self> {
        let (micros, id) = token
            .split_once('.')
            .ok_or_else(|| Error::InvalidCursor(token.to_string()))?;

        let micros: i64 = micros
            .parse()
            .map_err(|_| Error::InvalidCursor(token.to_string()))?;

        let created_at = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| Error::InvalidCursor(token.to_string()))?;

        if id.is_empty() {
            return Err(Error::InvalidCursor(token.to_string()));
        }

        Ok(Self::new(id, created_at))
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl FromStr for PageCursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s)
    }
}

impl TryFrom<String> for PageCursor {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_token(&value)
    }
}

impl From<PageCursor> for String {
    fn from(cursor: PageCursor) -> Self {
        cursor.to_token()
    }
}

/// Items that can act as a page boundary
pub trait Paged {
    fn page_cursor(&self) -> PageCursor;
}

impl Paged for CraftItem {
    fn page_cursor(&self) -> PageCursor {
        PageCursor::new(self.id.clone(), self.created_at)
    }
}

impl Paged for Photo {
    fn page_cursor(&self) -> PageCursor {
        PageCursor::new(self.id.clone(), self.created_at)
    }
}

/// Something that serves newest-first pages strictly after a cursor
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Paged + Clone + Send + Sync;

    async fn fetch_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<Vec<Self::Item>>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Arc<S> {
    type Item = S::Item;

    async fn fetch_page(&self, limit: usize, after: Option<&PageCursor>) -> Result<Vec<Self::Item>> {
        (**self).fetch_page(limit, after).await
    }
}

/// One page as served over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    /// Boundary to pass back for the following page
    pub next_cursor: Option<PageCursor>,
    /// A full page suggests more may follow
    pub has_more: bool,
}

impl<T: Paged> PageResponse<T> {
    pub fn new(items: Vec<T>, limit: usize) -> Self {
        Self {
            next_cursor: items.last().map(Paged::page_cursor),
            has_more: items.len() == limit,
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagerPhase {
    Idle,
    LoadingInitial,
    Ready,
    LoadingMore,
    Exhausted,
}

/// What asked for the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The sentinel below the grid scrolled into view
    SentinelVisible,
    /// The "load more" button
    LoadMoreClicked,
}

/// A fetch the pager has committed to; hand it back to [`CatalogPager::complete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub limit: usize,
    pub after: Option<PageCursor>,
    pub initial: bool,
}

/// Accumulated pages plus the cursor bookkeeping
#[derive(Debug, Clone)]
pub struct CatalogPager<T> {
    page_size: usize,
    items: Vec<T>,
    cursor: Option<PageCursor>,
    has_more: bool,
    loading_more: bool,
    phase: PagerPhase,
    generation: u64,
}

impl<T: Paged + Clone> CatalogPager<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            items: Vec::new(),
            cursor: None,
            has_more: false,
            loading_more: false,
            phase: PagerPhase::Idle,
            generation: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn phase(&self) -> PagerPhase {
        self.phase
    }

    /// Start over. Any fetch still in flight will be discarded on completion.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.cursor = None;
        self.has_more = false;
        self.loading_more = false;
        self.phase = PagerPhase::Idle;
    }

    /// Commit to fetching the first page
    pub fn begin_initial(&mut self) -> PageRequest {
        self.reset();
        self.phase = PagerPhase::LoadingInitial;

        PageRequest {
            generation: self.generation,
            limit: self.page_size,
            after: None,
            initial: true,
        }
    }

    /// Commit to fetching the next page, or `None` when a fetch is already
    /// in flight or nothing is left
    pub fn begin_next(&mut self) -> Option<PageRequest> {
        if self.loading_more || !self.has_more || self.phase != PagerPhase::Ready {
            return None;
        }

        self.loading_more = true;
        self.phase = PagerPhase::LoadingMore;

        Some(PageRequest {
            generation: self.generation,
            limit: self.page_size,
            after: self.cursor.clone(),
            initial: false,
        })
    }

    /// Apply the outcome of a fetch started with `begin_*`.
    /// Returns how many items were appended.
    pub fn complete(&mut self, request: &PageRequest, result: Result<Vec<T>>) -> Result<usize> {
        if request.generation != self.generation {
            debug!(
                "Dropping stale page (generation {} != {})",
                request.generation, self.generation
            );
            return Ok(0);
        }

        self.loading_more = false;

        match result {
            Ok(page) => {
                let fetched = page.len();

                if let Some(last) = page.last() {
                    self.cursor = Some(last.page_cursor());
                }
                self.has_more = fetched == request.limit;
                self.items.extend(page);
                self.phase = if self.has_more {
                    PagerPhase::Ready
                } else {
                    PagerPhase::Exhausted
                };

                debug!(
                    "Page applied: {} items (total {}), has_more={}",
                    fetched,
                    self.items.len(),
                    self.has_more
                );
                Ok(fetched)
            }
            Err(e) => {
                self.phase = if request.initial {
                    PagerPhase::Idle
                } else {
                    PagerPhase::Ready
                };
                Err(e)
            }
        }
    }

    pub async fn load_initial_page<S>(&mut self, source: &S) -> Result<usize>
    where
        S: PageSource<Item = T> + ?Sized,
    {
        let request = self.begin_initial();
        let result = source.fetch_page(request.limit, None).await;
        self.complete(&request, result)
    }

    /// Fetch the next page; a no-op while another fetch is in flight or
    /// after the last page
    pub async fn load_next_page<S>(&mut self, source: &S, trigger: Trigger) -> Result<usize>
    where
        S: PageSource<Item = T> + ?Sized,
    {
        let Some(request) = self.begin_next() else {
            debug!("Next page skipped ({:?}), phase {:?}", trigger, self.phase);
            return Ok(0);
        };

        debug!("Loading next page ({:?})", trigger);
        let result = source.fetch_page(request.limit, request.after.as_ref()).await;
        self.complete(&request, result)
    }
}

impl CatalogPager<CraftItem> {
    /// Filter what has been loaded so far
    pub fn filtered(&self, filter: &CatalogFilter) -> FilteredView {
        FilteredView {
            items: filter.apply(&self.items),
            partial: self.has_more,
        }
    }
}

/// A pager shared between the scroll sentinel and the "load more" button.
///
/// The lock is only held while starting and applying a fetch, so a second
/// trigger arriving mid-fetch observes `loading_more` and returns at once.
#[derive(Debug)]
pub struct SharedPager<T> {
    inner: Arc<Mutex<CatalogPager<T>>>,
    /// Signalled after every applied fetch
    settled: Arc<Notify>,
}

impl<T> Clone for SharedPager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            settled: Arc::clone(&self.settled),
        }
    }
}

impl<T: Paged + Clone> SharedPager<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CatalogPager::new(page_size))),
            settled: Arc::new(Notify::new()),
        }
    }

    pub async fn load_initial_page<S>(&self, source: &S) -> Result<usize>
    where
        S: PageSource<Item = T> + ?Sized,
    {
        let request = self.inner.lock().await.begin_initial();
        let result = source.fetch_page(request.limit, None).await;
        self.apply(&request, result).await
    }

    pub async fn load_next_page<S>(&self, source: &S, trigger: Trigger) -> Result<usize>
    where
        S: PageSource<Item = T> + ?Sized,
    {
        let request = {
            let mut pager = self.inner.lock().await;
            match pager.begin_next() {
                Some(request) => request,
                None => {
                    debug!("Next page skipped ({:?}), phase {:?}", trigger, pager.phase());
                    return Ok(0);
                }
            }
        };

        debug!("Loading next page ({:?})", trigger);
        let result = source.fetch_page(request.limit, request.after.as_ref()).await;
        self.apply(&request, result).await
    }

    async fn apply(&self, request: &PageRequest, result: Result<Vec<T>>) -> Result<usize> {
        let applied = self.inner.lock().await.complete(request, result);
        self.settled.notify_waiters();
        applied
    }

    /// Wait until no fetch is in flight, whichever trigger started it
    pub async fn settled(&self) {
        loop {
            let notified = self.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let busy = matches!(
                self.inner.lock().await.phase(),
                PagerPhase::LoadingInitial | PagerPhase::LoadingMore
            );
            if !busy {
                return;
            }
            notified.await;
        }
    }

    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }

    /// Run a closure against the current state
    pub async fn inspect<R>(&self, f: impl FnOnce(&CatalogPager<T>) -> R) -> R {
        let pager = self.inner.lock().await;
        f(&pager)
    }
}
