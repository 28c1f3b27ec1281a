//! Cursor-linked page accumulation with full-reload invalidation.
//!
//! Every reload bumps a generation counter. A page response is applied only if
//! the generation it was requested under is still current, so a next-page
//! response that races a reload is dropped instead of being appended to the
//! rebuilt list.

use std::{collections::HashSet, sync::Arc};

use shared::{
    domain::{Record, RecordId},
    protocol::{Cursor, Page},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    data_source::DataSource,
    error::{StateError, TransportError},
    resources::Resource,
};

const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A reload replaced every page with a fresh first page.
    Reloaded { items: usize },
    /// A next page was appended.
    Appended { items: usize, dropped_duplicates: usize },
    /// The list was already loaded; nothing to do.
    Cached,
    /// No request was issued.
    Skipped(StateError),
    /// No request was issued because the trigger fired inside its interval.
    Throttled,
    /// The response arrived after a newer reload and was thrown away.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerEvent {
    Loading,
    Reloaded { items: usize },
    PageAppended { page_index: usize, items: usize },
    Failed { message: String },
}

#[derive(Debug, Clone)]
pub struct PagerSnapshot<T> {
    pub status: LoadStatus,
    pub pages: Vec<Page<T>>,
    pub has_next_page: bool,
    pub fetching_next: bool,
    pub reloading: bool,
}

struct PagerState<T> {
    pages: Vec<Page<T>>,
    status: LoadStatus,
    generation: u64,
    next_in_flight: bool,
    reload_in_flight: bool,
}

impl<T> PagerState<T> {
    fn has_next_page(&self) -> bool {
        self.pages.last().is_some_and(Page::has_next)
    }
}

pub struct CursorPager<R: Resource> {
    source: Arc<dyn DataSource<R>>,
    inner: Mutex<PagerState<R::Record>>,
    events: broadcast::Sender<PagerEvent>,
}

impl<R: Resource> CursorPager<R> {
    pub fn new(source: Arc<dyn DataSource<R>>) -> Self {
        Self::with_event_buffer(source, DEFAULT_EVENT_BUFFER)
    }

    pub fn with_event_buffer(source: Arc<dyn DataSource<R>>, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            source,
            inner: Mutex::new(PagerState {
                pages: Vec::new(),
                status: LoadStatus::Idle,
                generation: 0,
                next_in_flight: false,
                reload_in_flight: false,
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PagerEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> LoadStatus {
        self.inner.lock().await.status.clone()
    }

    pub async fn has_next_page(&self) -> bool {
        self.inner.lock().await.has_next_page()
    }

    pub async fn pages(&self) -> Vec<Page<R::Record>> {
        self.inner.lock().await.pages.clone()
    }

    /// All loaded records in fetch order.
    pub async fn items(&self) -> Vec<R::Record> {
        let guard = self.inner.lock().await;
        guard
            .pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect()
    }

    pub async fn find(&self, id: RecordId) -> Option<R::Record> {
        let guard = self.inner.lock().await;
        guard
            .pages
            .iter()
            .flat_map(|page| page.items.iter())
            .find(|item| item.id() == id)
            .cloned()
    }

    pub async fn snapshot(&self) -> PagerSnapshot<R::Record> {
        let guard = self.inner.lock().await;
        PagerSnapshot {
            status: guard.status.clone(),
            pages: guard.pages.clone(),
            has_next_page: guard.has_next_page(),
            fetching_next: guard.next_in_flight,
            reloading: guard.reload_in_flight,
        }
    }

    /// Loads the first page on first observation; later calls are no-ops.
    pub async fn ensure_loaded(&self) -> Result<FetchOutcome, TransportError> {
        {
            let guard = self.inner.lock().await;
            match guard.status {
                LoadStatus::Idle => {}
                LoadStatus::Loading => return Ok(FetchOutcome::Skipped(StateError::FetchInFlight)),
                _ => return Ok(FetchOutcome::Cached),
            }
        }
        self.reload().await
    }

    /// Drops every accumulated page and reloads from the first one.
    pub async fn refetch(&self) -> Result<FetchOutcome, TransportError> {
        self.reload().await
    }

    /// Explicit retry affordance after a failed load.
    pub async fn retry(&self) -> Result<FetchOutcome, TransportError> {
        self.reload().await
    }

    async fn reload(&self) -> Result<FetchOutcome, TransportError> {
        let generation = {
            let mut guard = self.inner.lock().await;
            guard.generation += 1;
            guard.reload_in_flight = true;
            guard.next_in_flight = false;
            if guard.pages.is_empty() {
                guard.status = LoadStatus::Loading;
            }
            guard.generation
        };
        debug!(resource = R::PATH, generation, "reloading from first page");
        let _ = self.events.send(PagerEvent::Loading);

        let result = self.source.list(None).await;

        let mut guard = self.inner.lock().await;
        if guard.generation != generation {
            debug!(resource = R::PATH, generation, "discarding superseded reload");
            return Ok(FetchOutcome::Discarded);
        }
        guard.reload_in_flight = false;
        match result {
            Ok(page) => {
                let mut pages = Vec::with_capacity(1);
                let dropped = append_unique(&mut pages, page);
                if dropped > 0 {
                    warn!(resource = R::PATH, dropped, "first page repeated record ids");
                }
                let items = pages[0].items.len();
                guard.pages = pages;
                guard.status = LoadStatus::Ready;
                info!(resource = R::PATH, items, "list reloaded");
                let _ = self.events.send(PagerEvent::Reloaded { items });
                Ok(FetchOutcome::Reloaded { items })
            }
            Err(err) => {
                guard.pages.clear();
                guard.status = LoadStatus::Failed(err.clone());
                warn!(resource = R::PATH, error = %err, "list load failed");
                let _ = self.events.send(PagerEvent::Failed {
                    message: err.message().to_string(),
                });
                Err(err)
            }
        }
    }

    /// Fetches the page after the last loaded one. Issues no request when
    /// there is no next cursor or another fetch is in flight.
    pub async fn fetch_next(&self) -> Result<FetchOutcome, TransportError> {
        let (generation, cursor) = {
            let mut guard = self.inner.lock().await;
            let busy = guard.next_in_flight || guard.reload_in_flight;
            let skip = match guard.status {
                LoadStatus::Idle => Some(StateError::NotLoaded),
                LoadStatus::Failed(_) => Some(StateError::LoadFailed),
                _ if busy => Some(StateError::FetchInFlight),
                _ => None,
            };
            if let Some(reason) = skip {
                debug!(resource = R::PATH, %reason, "next page fetch skipped");
                return Ok(FetchOutcome::Skipped(reason));
            }
            let Some(cursor) = guard.pages.last().and_then(|page| page.cursor.clone()) else {
                debug!(resource = R::PATH, "no next cursor; fetch skipped");
                return Ok(FetchOutcome::Skipped(StateError::NoNextPage));
            };
            guard.next_in_flight = true;
            (guard.generation, cursor)
        };
        self.fetch_after(generation, cursor).await
    }

    async fn fetch_after(
        &self,
        generation: u64,
        cursor: Cursor,
    ) -> Result<FetchOutcome, TransportError> {
        debug!(resource = R::PATH, cursor = %cursor, "fetching next page");
        let result = self.source.list(Some(&cursor)).await;

        let mut guard = self.inner.lock().await;
        if guard.generation != generation {
            debug!(resource = R::PATH, cursor = %cursor, "discarding stale next page");
            return Ok(FetchOutcome::Discarded);
        }
        guard.next_in_flight = false;
        match result {
            Ok(page) => {
                let incoming = page.items.len();
                let dropped_duplicates = append_unique(&mut guard.pages, page);
                let items = incoming - dropped_duplicates;
                let page_index = guard.pages.len() - 1;
                debug!(
                    resource = R::PATH,
                    page_index,
                    items,
                    dropped_duplicates,
                    "page appended"
                );
                let _ = self.events.send(PagerEvent::PageAppended { page_index, items });
                Ok(FetchOutcome::Appended {
                    items,
                    dropped_duplicates,
                })
            }
            Err(err) => {
                guard.pages.clear();
                guard.status = LoadStatus::Failed(err.clone());
                warn!(resource = R::PATH, error = %err, "next page fetch failed");
                let _ = self.events.send(PagerEvent::Failed {
                    message: err.message().to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Appends `page`, dropping records whose id is already loaded. Returns how
/// many were dropped.
fn append_unique<T: Record>(pages: &mut Vec<Page<T>>, mut page: Page<T>) -> usize {
    let mut seen: HashSet<RecordId> = pages
        .iter()
        .flat_map(|page| page.items.iter().map(Record::id))
        .collect();
    let before = page.items.len();
    page.items.retain(|item| seen.insert(item.id()));
    let dropped = before - page.items.len();
    pages.push(page);
    dropped
}

#[cfg(test)]
#[path = "tests/pager_tests.rs"]
mod tests;
