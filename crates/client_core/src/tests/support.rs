//! In-process catalog service used by the HTTP and session tests.

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::{Availability, BookId},
    error::ApiError,
    protocol::{Book, CreateBookRequest, Paginated, UpdateBookRequest},
};
use tokio::{
    net::TcpListener,
    sync::{Mutex, MutexGuard},
};

pub(crate) const TIMESTAMP: &str = "2024-01-01T00:00:00Z";

pub(crate) fn sample_book(id: &str, title: &str, owner: &str, availability: Availability) -> Book {
    Book {
        id: BookId::from(id),
        title: title.to_string(),
        author: format!("Author of {title}"),
        owner: owner.to_string(),
        availability,
        isbn: None,
        description: None,
        published_year: None,
        created_at: TIMESTAMP.parse().expect("timestamp"),
        updated_at: TIMESTAMP.parse().expect("timestamp"),
    }
}

/// Numbered books "Book 1".."Book n", all available and owned by alice.
pub(crate) fn numbered_books(count: usize) -> Vec<Book> {
    (1..=count)
        .map(|n| sample_book(&n.to_string(), &format!("Book {n}"), "alice", Availability::Available))
        .collect()
}

#[derive(Default)]
pub(crate) struct MockState {
    pub books: Vec<Book>,
    pub next_id: u64,
    pub search_log: Vec<HashMap<String, String>>,
    pub mutation_log: Vec<String>,
    /// When set, every search answers with this status and raw body.
    pub failing_search: Option<(StatusCode, String)>,
}

#[derive(Clone, Default)]
pub(crate) struct MockCatalog {
    inner: Arc<Mutex<MockState>>,
}

impl MockCatalog {
    pub(crate) fn with_books(books: Vec<Book>) -> Self {
        let next_id = books.len() as u64 + 1;
        Self {
            inner: Arc::new(Mutex::new(MockState {
                books,
                next_id,
                ..MockState::default()
            })),
        }
    }

    pub(crate) async fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().await
    }

    pub(crate) async fn search_count(&self) -> usize {
        self.inner.lock().await.search_log.len()
    }

    pub(crate) async fn last_search(&self) -> HashMap<String, String> {
        self.inner
            .lock()
            .await
            .search_log
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

/// Serves the catalog under `/api` and returns the base URL.
pub(crate) async fn spawn_catalog(catalog: MockCatalog) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/books", get(search_books).post(create_book))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/books/:id/borrow", post(borrow_book))
        .route("/api/books/:id/return", post(return_book))
        .with_state(catalog);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ApiError::new(message))).into_response()
}

fn matches_query(book: &Book, query: &str) -> bool {
    let query = query.to_lowercase();
    book.title.to_lowercase().contains(&query)
        || book.author.to_lowercase().contains(&query)
        || book
            .isbn
            .as_deref()
            .is_some_and(|isbn| isbn.to_lowercase().contains(&query))
}

async fn search_books(
    State(catalog): State<MockCatalog>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = catalog.inner.lock().await;
    state.search_log.push(params.clone());
    if let Some((status, body)) = state.failing_search.clone() {
        return (status, body).into_response();
    }

    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: u32 = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(12);
    let availability = params
        .get("availability")
        .and_then(|a| a.parse::<Availability>().ok());

    let matching: Vec<Book> = state
        .books
        .iter()
        .filter(|book| params.get("query").map_or(true, |q| matches_query(book, q)))
        .filter(|book| params.get("owner").map_or(true, |o| &book.owner == o))
        .filter(|book| availability.map_or(true, |a| book.availability == a))
        .cloned()
        .collect();

    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(((page.max(1) - 1) * limit) as usize)
        .take(limit as usize)
        .collect();
    Json(Paginated::new(items, total, page, limit)).into_response()
}

async fn get_book(State(catalog): State<MockCatalog>, Path(id): Path<String>) -> Response {
    let state = catalog.inner.lock().await;
    match state.books.iter().find(|book| book.id.as_str() == id) {
        Some(book) => Json(book.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Book not found"),
    }
}

async fn create_book(
    State(catalog): State<MockCatalog>,
    Json(request): Json<CreateBookRequest>,
) -> Response {
    if let Err(errors) = request.validate(2100) {
        return error_response(StatusCode::BAD_REQUEST, &errors.to_string());
    }
    let mut state = catalog.inner.lock().await;
    let id = state.next_id.to_string();
    state.next_id += 1;
    let mut book = sample_book(&id, &request.title, &request.owner, Availability::Available);
    book.author = request.author;
    book.isbn = request.isbn;
    book.description = request.description;
    book.published_year = request.published_year;
    state.books.push(book.clone());
    state.mutation_log.push(format!("create {id}"));
    (StatusCode::CREATED, Json(book)).into_response()
}

async fn update_book(
    State(catalog): State<MockCatalog>,
    Path(id): Path<String>,
    Json(request): Json<UpdateBookRequest>,
) -> Response {
    let mut state = catalog.inner.lock().await;
    state.mutation_log.push(format!("update {id}"));
    let Some(book) = state.books.iter_mut().find(|book| book.id.as_str() == id) else {
        return error_response(StatusCode::NOT_FOUND, "Book not found");
    };
    if let Some(title) = request.title {
        book.title = title;
    }
    if let Some(author) = request.author {
        book.author = author;
    }
    if let Some(owner) = request.owner {
        book.owner = owner;
    }
    if request.isbn.is_some() {
        book.isbn = request.isbn;
    }
    if request.description.is_some() {
        book.description = request.description;
    }
    if request.published_year.is_some() {
        book.published_year = request.published_year;
    }
    Json(book.clone()).into_response()
}

async fn delete_book(State(catalog): State<MockCatalog>, Path(id): Path<String>) -> Response {
    let mut state = catalog.inner.lock().await;
    state.mutation_log.push(format!("delete {id}"));
    let before = state.books.len();
    state.books.retain(|book| book.id.as_str() != id);
    if state.books.len() == before {
        return error_response(StatusCode::NOT_FOUND, "Book not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn borrow_book(State(catalog): State<MockCatalog>, Path(id): Path<String>) -> Response {
    transition(catalog, id, Availability::Borrowed, "Book is already borrowed").await
}

async fn return_book(State(catalog): State<MockCatalog>, Path(id): Path<String>) -> Response {
    transition(catalog, id, Availability::Available, "Book is not borrowed").await
}

async fn transition(
    catalog: MockCatalog,
    id: String,
    target: Availability,
    conflict_message: &str,
) -> Response {
    let mut state = catalog.inner.lock().await;
    state.mutation_log.push(format!("{} {id}", target.as_str()));
    let Some(book) = state.books.iter_mut().find(|book| book.id.as_str() == id) else {
        return error_response(StatusCode::NOT_FOUND, "Book not found");
    };
    if book.availability == target {
        return error_response(StatusCode::CONFLICT, conflict_message);
    }
    book.availability = target;
    Json(book.clone()).into_response()
}
