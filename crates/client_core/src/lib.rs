use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::BookId,
    error::ApiException,
    protocol::{Book, CreateBookRequest, Paginated, SearchRequest, UpdateBookRequest},
};
use thiserror::Error;
use tracing::{debug, warn};

pub mod params;
pub mod session;
pub mod settings;
pub mod view;

pub use session::{CatalogSession, FetchOutcome, SessionEvent, SessionSnapshot};
pub use settings::{load_settings, ClientSettings};

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Non-2xx response; displays the service-provided message.
    #[error(transparent)]
    Service(#[from] ApiException),
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response from catalog service: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value)
        }
    }
}

impl CatalogError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service(err) => Some(err.status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Remote catalog operations. Implementations carry no session state.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search_books(&self, request: &SearchRequest) -> Result<Paginated<Book>, CatalogError>;
    async fn get_book(&self, id: &BookId) -> Result<Book, CatalogError>;
    async fn create_book(&self, request: &CreateBookRequest) -> Result<Book, CatalogError>;
    async fn update_book(
        &self,
        id: &BookId,
        request: &UpdateBookRequest,
    ) -> Result<Book, CatalogError>;
    async fn delete_book(&self, id: &BookId) -> Result<(), CatalogError>;
    async fn borrow_book(&self, id: &BookId) -> Result<Book, CatalogError>;
    async fn return_book(&self, id: &BookId) -> Result<Book, CatalogError>;
}

/// `CatalogApi` over HTTP+JSON against `{base_url}/books`.
#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    http: Client,
    base_url: String,
}

impl HttpCatalogApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn books_url(&self) -> String {
        format!("{}/books", self.base_url)
    }

    fn book_url(&self, id: &BookId) -> String {
        format!("{}/books/{}", self.base_url, id)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn search_books(&self, request: &SearchRequest) -> Result<Paginated<Book>, CatalogError> {
        debug!(
            query = %request.query,
            page = request.page,
            limit = request.limit,
            "catalog: search books"
        );
        let response = self
            .http
            .get(self.books_url())
            .query(&request.query_pairs())
            .send()
            .await?;
        read_json(response).await
    }

    async fn get_book(&self, id: &BookId) -> Result<Book, CatalogError> {
        let response = self.http.get(self.book_url(id)).send().await?;
        read_json(response).await
    }

    async fn create_book(&self, request: &CreateBookRequest) -> Result<Book, CatalogError> {
        debug!(title = %request.title, "catalog: create book");
        let response = self
            .http
            .post(self.books_url())
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_book(
        &self,
        id: &BookId,
        request: &UpdateBookRequest,
    ) -> Result<Book, CatalogError> {
        debug!(book_id = %id, "catalog: update book");
        let response = self
            .http
            .put(self.book_url(id))
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_book(&self, id: &BookId) -> Result<(), CatalogError> {
        debug!(book_id = %id, "catalog: delete book");
        let response = self.http.delete(self.book_url(id)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn borrow_book(&self, id: &BookId) -> Result<Book, CatalogError> {
        debug!(book_id = %id, "catalog: borrow book");
        let response = self
            .http
            .post(format!("{}/borrow", self.book_url(id)))
            .send()
            .await?;
        read_json(response).await
    }

    async fn return_book(&self, id: &BookId) -> Result<Book, CatalogError> {
        debug!(book_id = %id, "catalog: return book");
        let response = self
            .http
            .post(format!("{}/return", self.book_url(id)))
            .send()
            .await?;
        read_json(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // An unreadable body is treated like an empty one.
    let body = response.bytes().await.unwrap_or_default();
    let err = ApiException::from_response_body(status.as_u16(), &body);
    warn!(status = status.as_u16(), message = %err.message, "catalog: request failed");
    Err(err.into())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CatalogError> {
    let body = ensure_success(response).await?.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| CatalogError::Decode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
