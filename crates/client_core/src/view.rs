//! Read-only view model derived from a [`SessionSnapshot`].

use shared::{
    domain::{BookId, LendingAction},
    protocol::{Book, Paginated},
};

use crate::session::SessionSnapshot;

pub const NO_BOOKS_TITLE: &str = "No books found";
pub const NO_BOOKS_HINT: &str =
    "Try adjusting your search criteria or add some books to the library.";
pub const LOADING_TEXT: &str = "Loading books...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingView {
    Loading,
    Empty,
    Rows {
        rows: Vec<BookRow>,
        pagination: PaginationView,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRow {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub owner: String,
    pub availability: &'static str,
    pub action: LendingAction,
}

impl From<&Book> for BookRow {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            owner: book.owner.clone(),
            availability: book.availability.label(),
            action: book.availability.lending_action(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationView {
    /// Everything fits on one page; no prev/next controls.
    Summary { total: u64 },
    Controls {
        start: u64,
        end: u64,
        total: u64,
        page: u32,
        total_pages: u32,
    },
}

impl PaginationView {
    pub fn from_page<T>(page: &Paginated<T>) -> Self {
        if page.total_pages <= 1 {
            return Self::Summary { total: page.total };
        }
        let (start, end) = display_range(page.page, page.limit, page.total);
        Self::Controls {
            start,
            end,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
        }
    }

    pub fn summary_text(&self) -> String {
        match self {
            Self::Summary { total } => {
                let noun = if *total == 1 { "book" } else { "books" };
                format!("Showing {total} {noun}")
            }
            Self::Controls {
                start, end, total, ..
            } => format!("Showing {start}-{end} of {total} books"),
        }
    }

    pub fn previous_page(&self) -> Option<u32> {
        match self {
            Self::Controls { page, .. } if *page > 1 => Some(page - 1),
            _ => None,
        }
    }

    pub fn next_page(&self) -> Option<u32> {
        match self {
            Self::Controls {
                page, total_pages, ..
            } if page < total_pages => Some(page + 1),
            _ => None,
        }
    }
}

/// 1-based inclusive item range shown for `page`, clamped to `total`.
pub fn display_range(page: u32, limit: u32, total: u64) -> (u64, u64) {
    let page = u64::from(page.max(1));
    let limit = u64::from(limit);
    let start = ((page - 1) * limit + 1).min(total);
    let end = (page * limit).min(total);
    (start, end)
}

pub fn listing(snapshot: &SessionSnapshot) -> ListingView {
    if snapshot.loading {
        return ListingView::Loading;
    }
    let page = &snapshot.current_page;
    if page.is_empty() {
        return ListingView::Empty;
    }
    ListingView::Rows {
        rows: page.items.iter().map(BookRow::from).collect(),
        pagination: PaginationView::from_page(page),
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
