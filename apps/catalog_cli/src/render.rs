//! Plain-text rendering of session snapshots.

use std::fmt::Write as _;

use client_core::{
    view::{listing, ListingView, PaginationView, LOADING_TEXT, NO_BOOKS_HINT, NO_BOOKS_TITLE},
    SessionSnapshot,
};
use shared::{error::ValidationErrors, protocol::Book};

const TITLE_WIDTH: usize = 32;
const OWNER_WIDTH: usize = 16;

pub fn snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    if let Some(message) = &snapshot.last_error {
        out.push_str(&error_banner(message));
        out.push('\n');
    }
    out.push_str(&listing_text(snapshot));
    out
}

pub fn error_banner(message: &str) -> String {
    format!("Error: {message}\n  (run `retry` to reload the last search)")
}

fn listing_text(snapshot: &SessionSnapshot) -> String {
    match listing(snapshot) {
        ListingView::Loading => LOADING_TEXT.to_string(),
        ListingView::Empty => format!("{NO_BOOKS_TITLE}\n{NO_BOOKS_HINT}"),
        ListingView::Rows { rows, pagination } => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "{:<6} {:<TITLE_WIDTH$} {:<OWNER_WIDTH$} {:<10} ACTION",
                "ID", "TITLE", "OWNER", "STATUS"
            );
            for row in rows {
                let _ = writeln!(
                    out,
                    "{:<6} {:<TITLE_WIDTH$} {:<OWNER_WIDTH$} {:<10} {}",
                    row.id.as_str(),
                    truncate(&row.title, TITLE_WIDTH),
                    truncate(&row.owner, OWNER_WIDTH),
                    row.availability,
                    row.action.label().to_lowercase()
                );
            }
            out.push_str(&pagination.summary_text());
            if let PaginationView::Controls {
                page, total_pages, ..
            } = &pagination
            {
                let prev = if pagination.previous_page().is_some() { "<" } else { " " };
                let next = if pagination.next_page().is_some() { ">" } else { " " };
                let _ = write!(out, "    {prev} {page} of {total_pages} {next}");
            }
            out
        }
    }
}

pub fn book_detail(book: &Book) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", book.title, book.id);
    let _ = writeln!(out, "  by {}", book.author);
    let _ = writeln!(out, "  Owner: {}", book.owner);
    if let Some(isbn) = &book.isbn {
        let _ = writeln!(out, "  ISBN: {isbn}");
    }
    if let Some(year) = book.published_year {
        let _ = writeln!(out, "  Published: {year}");
    }
    if let Some(description) = &book.description {
        let _ = writeln!(out, "  {description}");
    }
    let _ = write!(
        out,
        "  {} ({} to change)",
        book.availability.label(),
        book.availability.lending_action().label().to_lowercase()
    );
    out
}

pub fn validation_errors(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("  {field}: {message}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use shared::{
        domain::{Availability, BookId},
        protocol::{BookSearchParams, Paginated},
    };

    use super::*;

    fn book(id: &str, title: &str, availability: Availability) -> Book {
        Book {
            id: BookId::from(id),
            title: title.to_string(),
            author: "Someone".to_string(),
            owner: "alice".to_string(),
            availability,
            isbn: None,
            description: None,
            published_year: Some(1999),
            created_at: "2024-01-01T00:00:00Z".parse().expect("timestamp"),
            updated_at: "2024-01-01T00:00:00Z".parse().expect("timestamp"),
        }
    }

    fn snapshot_of(page: Paginated<Book>, last_error: Option<&str>) -> SessionSnapshot {
        SessionSnapshot {
            params: BookSearchParams::default(),
            current_page: page,
            loading: false,
            last_error: last_error.map(str::to_string),
        }
    }

    #[test]
    fn renders_empty_state_without_pagination() {
        let text = snapshot(&snapshot_of(Paginated::empty(12), None));
        assert!(text.starts_with("No books found"));
        assert!(!text.contains("Showing"));
    }

    #[test]
    fn renders_range_and_page_controls() {
        let items = (21..=25)
            .map(|n| book(&n.to_string(), &format!("Book {n}"), Availability::Available))
            .collect();
        let text = snapshot(&snapshot_of(Paginated::new(items, 25, 3, 10), None));
        assert!(text.contains("Showing 21-25 of 25 books"));
        assert!(text.contains("< 3 of 3  "));
        assert!(text.contains("borrow"));
    }

    #[test]
    fn error_banner_precedes_last_good_listing() {
        let page = Paginated::new(vec![book("1", "Dune", Availability::Borrowed)], 1, 1, 12);
        let text = snapshot(&snapshot_of(page, Some("Book is already borrowed")));
        assert!(text.starts_with("Error: Book is already borrowed"));
        assert!(text.contains("Showing 1 book"));
        assert!(text.contains("return"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
    }

    #[test]
    fn detail_lists_optional_fields_when_present() {
        let text = book_detail(&book("9", "Dune", Availability::Available));
        assert!(text.contains("Published: 1999"));
        assert!(!text.contains("ISBN"));
        assert!(text.ends_with("Available (borrow to change)"));
    }
}
