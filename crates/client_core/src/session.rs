//! Catalog session controller: owns the search parameters and the current
//! page, and funnels every read and post-mutation refresh through one fetch
//! path.
//!
//! Fetches may overlap. Each one takes a sequence number when dispatched and
//! its result is applied only if no later-dispatched fetch has already been
//! applied, so a slow earlier response can never overwrite a newer page.

use std::sync::Arc;

use shared::{
    domain::{Availability, BookId},
    protocol::{
        Book, BookSearchParams, CreateBookRequest, Paginated, SearchRequest, UpdateBookRequest,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::{
    params::{merge_params, resolve, DEFAULT_PAGE, DEFAULT_PAGE_SIZE},
    CatalogApi, CatalogError,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub params: BookSearchParams,
    pub current_page: Paginated<Book>,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the current page.
    Applied,
    /// The request failed; the message is now the session's last error.
    Failed(String),
    /// A later fetch was applied first, so this response was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoadingChanged(bool),
    PageReplaced {
        page: u32,
        total: u64,
        total_pages: u32,
    },
    Error(String),
    StaleResponseDiscarded {
        sequence: u64,
    },
}

struct SessionState {
    params: BookSearchParams,
    current_page: Paginated<Book>,
    loading: bool,
    last_error: Option<String>,
    last_request: Option<SearchRequest>,
    latest_dispatched: u64,
    latest_applied: u64,
}

pub struct CatalogSession {
    api: Arc<dyn CatalogApi>,
    default_limit: u32,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl CatalogSession {
    pub fn new(api: Arc<dyn CatalogApi>) -> Arc<Self> {
        Self::with_params(api, BookSearchParams::default(), DEFAULT_PAGE_SIZE)
    }

    pub fn with_params(
        api: Arc<dyn CatalogApi>,
        initial_params: BookSearchParams,
        default_limit: u32,
    ) -> Arc<Self> {
        let default_limit = if default_limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            default_limit
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            api,
            default_limit,
            inner: Mutex::new(SessionState {
                params: initial_params,
                current_page: Paginated::empty(default_limit),
                loading: false,
                last_error: None,
                last_request: None,
                latest_dispatched: 0,
                latest_applied: 0,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        SessionSnapshot {
            params: guard.params.clone(),
            current_page: guard.current_page.clone(),
            loading: guard.loading,
            last_error: guard.last_error.clone(),
        }
    }

    pub async fn params(&self) -> BookSearchParams {
        self.inner.lock().await.params.clone()
    }

    /// Merges `overrides` over the held parameters and loads that page. The
    /// held parameters themselves are left as they are.
    pub async fn fetch(&self, overrides: Option<BookSearchParams>) -> FetchOutcome {
        let (sequence, request) = {
            let mut guard = self.inner.lock().await;
            let merged = match &overrides {
                Some(overrides) => merge_params(&guard.params, overrides),
                None => guard.params.clone(),
            };
            let request = resolve(&merged, self.default_limit);
            let sequence = begin_fetch(&mut guard, request.clone());
            (sequence, request)
        };
        self.run_fetch(sequence, request).await
    }

    /// Re-sends the last dispatched search with identical parameters.
    pub async fn retry(&self) -> FetchOutcome {
        let dispatched = {
            let mut guard = self.inner.lock().await;
            guard
                .last_request
                .clone()
                .map(|request| (begin_fetch(&mut guard, request.clone()), request))
        };
        match dispatched {
            Some((sequence, request)) => self.run_fetch(sequence, request).await,
            None => self.fetch(None).await,
        }
    }

    pub async fn search(&self, query: impl Into<String>) -> FetchOutcome {
        let query = query.into();
        self.replace_params(|params| {
            params.query = Some(query);
            params.page = Some(DEFAULT_PAGE);
        })
        .await
    }

    pub async fn change_page(&self, page: u32) -> FetchOutcome {
        self.replace_params(|params| params.page = Some(page)).await
    }

    /// Replaces the owner and availability filters and goes back to page 1.
    pub async fn set_filters(
        &self,
        owner: Option<String>,
        availability: Option<Availability>,
    ) -> FetchOutcome {
        self.replace_params(|params| {
            params.owner = owner;
            params.availability = availability;
            params.page = Some(DEFAULT_PAGE);
        })
        .await
    }

    /// Reads one book without touching session state.
    pub async fn book(&self, id: &BookId) -> Result<Book, CatalogError> {
        self.api.get_book(id).await
    }

    pub async fn create_book(&self, data: CreateBookRequest) -> Result<Book, CatalogError> {
        let params = self.params().await;
        let result = self.api.create_book(&data).await;
        self.finish_mutation("create", params, result).await
    }

    pub async fn update_book(
        &self,
        id: &BookId,
        data: UpdateBookRequest,
    ) -> Result<Book, CatalogError> {
        let params = self.params().await;
        let result = self.api.update_book(id, &data).await;
        self.finish_mutation("update", params, result).await
    }

    pub async fn delete_book(&self, id: &BookId) -> Result<(), CatalogError> {
        let params = self.params().await;
        let result = self.api.delete_book(id).await;
        self.finish_mutation("delete", params, result).await
    }

    pub async fn borrow_book(&self, id: &BookId) -> Result<Book, CatalogError> {
        let params = self.params().await;
        let result = self.api.borrow_book(id).await;
        self.finish_mutation("borrow", params, result).await
    }

    pub async fn return_book(&self, id: &BookId) -> Result<Book, CatalogError> {
        let params = self.params().await;
        let result = self.api.return_book(id).await;
        self.finish_mutation("return", params, result).await
    }

    async fn replace_params(&self, edit: impl FnOnce(&mut BookSearchParams)) -> FetchOutcome {
        let params = {
            let mut guard = self.inner.lock().await;
            let mut params = guard.params.clone();
            edit(&mut params);
            guard.params = params.clone();
            params
        };
        self.fetch(Some(params)).await
    }

    /// Refreshes the held parameters after a successful mutation; on failure
    /// records the message and hands the error back unchanged.
    ///
    /// `issued_with` is the parameter set held when the mutation was called.
    /// If the user has since moved to other parameters and that fetch is
    /// still in flight, the refresh is skipped so it cannot supersede it.
    async fn finish_mutation<T>(
        &self,
        action: &'static str,
        issued_with: BookSearchParams,
        result: Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        match result {
            Ok(value) => {
                let user_fetch_pending = {
                    let guard = self.inner.lock().await;
                    guard.params != issued_with
                        && guard.latest_applied < guard.latest_dispatched
                };
                if user_fetch_pending {
                    debug!(action, "catalog: mutation succeeded, newer search in flight");
                } else {
                    debug!(action, "catalog: mutation succeeded, refreshing page");
                    self.fetch(None).await;
                }
                Ok(value)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(action, error = %message, "catalog: mutation failed");
                self.inner.lock().await.last_error = Some(message.clone());
                let _ = self.events.send(SessionEvent::Error(message));
                Err(err)
            }
        }
    }

    async fn run_fetch(&self, sequence: u64, request: SearchRequest) -> FetchOutcome {
        let _ = self.events.send(SessionEvent::LoadingChanged(true));
        debug!(sequence, page = request.page, query = %request.query, "catalog: fetch dispatched");

        let result = self.api.search_books(&request).await;

        let mut guard = self.inner.lock().await;
        if sequence <= guard.latest_applied {
            drop(guard);
            warn!(sequence, "catalog: discarding stale search response");
            let _ = self
                .events
                .send(SessionEvent::StaleResponseDiscarded { sequence });
            return FetchOutcome::Superseded;
        }

        guard.latest_applied = sequence;
        guard.loading = sequence < guard.latest_dispatched;
        let loading = guard.loading;
        let (outcome, event) = match result {
            Ok(page) => {
                let event = SessionEvent::PageReplaced {
                    page: page.page,
                    total: page.total,
                    total_pages: page.total_pages,
                };
                guard.current_page = page;
                guard.last_error = None;
                (FetchOutcome::Applied, event)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(sequence, error = %message, "catalog: fetch failed");
                guard.last_error = Some(message.clone());
                (FetchOutcome::Failed(message.clone()), SessionEvent::Error(message))
            }
        };
        drop(guard);

        let _ = self.events.send(event);
        if !loading {
            let _ = self.events.send(SessionEvent::LoadingChanged(false));
        }
        outcome
    }
}

fn begin_fetch(state: &mut SessionState, request: SearchRequest) -> u64 {
    state.latest_dispatched += 1;
    state.loading = true;
    state.last_error = None;
    state.last_request = Some(request);
    state.latest_dispatched
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
