mod render;
mod shell;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings, settings::normalize_base_url, CatalogSession, FetchOutcome, HttpCatalogApi,
};
use shared::{
    domain::{Availability, BookId},
    protocol::{BookSearchParams, CreateBookRequest, UpdateBookRequest},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalog", about = "Browse and manage a shared book catalog")]
struct Cli {
    /// Catalog service base url, e.g. http://localhost:5292/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Page size
    #[arg(long, global = true)]
    limit: Option<u32>,
    #[arg(long, global = true)]
    owner: Option<String>,
    /// `available` or `borrowed`
    #[arg(long, global = true)]
    availability: Option<Availability>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of the catalog
    List {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long, short)]
        page: Option<u32>,
    },
    /// Print every field of one book
    Show {
        id: String,
    },
    /// Add a new book
    Add(BookForm),
    /// Change fields of an existing book
    Edit {
        id: String,
        #[command(flatten)]
        changes: EditForm,
    },
    /// Remove a book
    Delete {
        id: String,
    },
    /// Mark a book as borrowed
    Borrow {
        id: String,
    },
    /// Mark a borrowed book as available again
    Return {
        id: String,
    },
    /// Interactive session
    Shell,
}

#[derive(Args, Debug)]
struct BookForm {
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    author: String,
    #[arg(long = "book-owner", default_value = "")]
    book_owner: String,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    published_year: Option<i32>,
}

#[derive(Args, Debug)]
struct EditForm {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long = "book-owner")]
    book_owner: Option<String>,
    #[arg(long)]
    isbn: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    published_year: Option<i32>,
}

impl From<BookForm> for CreateBookRequest {
    fn from(form: BookForm) -> Self {
        Self {
            title: form.title,
            author: form.author,
            owner: form.book_owner,
            isbn: form.isbn,
            description: form.description,
            published_year: form.published_year,
        }
    }
}

impl From<EditForm> for UpdateBookRequest {
    fn from(form: EditForm) -> Self {
        Self {
            title: form.title,
            author: form.author,
            owner: form.book_owner,
            isbn: form.isbn,
            description: form.description,
            published_year: form.published_year,
        }
    }
}

/// Fields set in `changes` replace those of `base`.
fn overlay(mut base: UpdateBookRequest, changes: UpdateBookRequest) -> UpdateBookRequest {
    if changes.title.is_some() {
        base.title = changes.title;
    }
    if changes.author.is_some() {
        base.author = changes.author;
    }
    if changes.owner.is_some() {
        base.owner = changes.owner;
    }
    if changes.isbn.is_some() {
        base.isbn = changes.isbn;
    }
    if changes.description.is_some() {
        base.description = changes.description;
    }
    if changes.published_year.is_some() {
        base.published_year = changes.published_year;
    }
    base
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.api_url.clone() {
        settings.api_base_url = url;
    }
    if let Some(limit) = cli.limit.filter(|limit| *limit > 0) {
        settings.page_size = limit;
    }
    let base_url = normalize_base_url(&settings.api_base_url).context("resolving --api-url")?;
    info!(%base_url, page_size = settings.page_size, "catalog client starting");

    let initial = BookSearchParams {
        owner: cli.owner.clone(),
        availability: cli.availability,
        ..BookSearchParams::default()
    };
    let session = CatalogSession::with_params(
        Arc::new(HttpCatalogApi::new(base_url)),
        initial,
        settings.page_size,
    );

    run(cli.command, session).await
}

async fn run(command: Command, session: Arc<CatalogSession>) -> Result<()> {
    match command {
        Command::List { query, page } => {
            let overrides = BookSearchParams {
                query,
                page,
                ..BookSearchParams::default()
            };
            let outcome = session.fetch(Some(overrides)).await;
            println!("{}", render::snapshot(&session.snapshot().await));
            if let FetchOutcome::Failed(message) = outcome {
                bail!(message);
            }
        }
        Command::Show { id } => {
            let book = session.book(&BookId::from(id)).await?;
            println!("{}", render::book_detail(&book));
        }
        Command::Add(form) => {
            let request = CreateBookRequest::from(form).normalized();
            if let Err(errors) = request.validate(current_year()) {
                eprintln!("{}", render::validation_errors(&errors));
                bail!("book not saved: {} field(s) need attention", errors.len());
            }
            let book = session.create_book(request).await?;
            println!("Added:\n{}", render::book_detail(&book));
            println!("{}", render::snapshot(&session.snapshot().await));
        }
        Command::Edit { id, changes } => {
            let changes = UpdateBookRequest::from(changes);
            if changes.is_empty() {
                bail!("nothing to change: pass at least one field flag");
            }
            let id = BookId::from(id);
            let current = session.book(&id).await?;
            let request = overlay(UpdateBookRequest::from(&current), changes);
            if let Err(errors) = request.validate(current_year()) {
                eprintln!("{}", render::validation_errors(&errors));
                bail!("book not saved: {} field(s) need attention", errors.len());
            }
            let book = session.update_book(&id, request).await?;
            println!("Updated:\n{}", render::book_detail(&book));
            println!("{}", render::snapshot(&session.snapshot().await));
        }
        Command::Delete { id } => {
            session.delete_book(&BookId::from(id)).await?;
            println!("{}", render::snapshot(&session.snapshot().await));
        }
        Command::Borrow { id } => {
            let book = session.borrow_book(&BookId::from(id)).await?;
            println!("Borrowed: {}", book.title);
            println!("{}", render::snapshot(&session.snapshot().await));
        }
        Command::Return { id } => {
            let book = session.return_book(&BookId::from(id)).await?;
            println!("Returned: {}", book.title);
            println!("{}", render::snapshot(&session.snapshot().await));
        }
        Command::Shell => shell::run(session).await?,
    }
    Ok(())
}

fn current_year() -> i32 {
    Utc::now().year()
}
