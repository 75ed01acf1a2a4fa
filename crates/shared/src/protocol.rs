use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Availability, BookId},
    error::ValidationErrors,
};

pub const MIN_PUBLISHED_YEAR: i32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub owner: String,
    pub availability: Availability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
}

impl CreateBookRequest {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            owner: owner.into(),
            ..Self::default()
        }
    }

    /// Blank optional fields become absent so they are left out of the body.
    pub fn normalized(mut self) -> Self {
        self.isbn = non_blank(self.isbn);
        self.description = non_blank(self.description);
        self
    }

    pub fn validate(&self, current_year: i32) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require_text(&mut errors, "title", "Title", Some(&self.title));
        require_text(&mut errors, "author", "Author", Some(&self.author));
        require_text(&mut errors, "owner", "Owner", Some(&self.owner));
        check_year(&mut errors, self.published_year, current_year);
        errors.into_result()
    }
}

/// Partial update. Has no availability field: lending state
/// only moves through borrow/return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
}

impl UpdateBookRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self, current_year: i32) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        require_text(&mut errors, "title", "Title", self.title.as_ref());
        require_text(&mut errors, "author", "Author", self.author.as_ref());
        require_text(&mut errors, "owner", "Owner", self.owner.as_ref());
        check_year(&mut errors, self.published_year, current_year);
        errors.into_result()
    }
}

impl From<&Book> for UpdateBookRequest {
    fn from(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            author: Some(book.author.clone()),
            owner: Some(book.owner.clone()),
            isbn: book.isbn.clone(),
            description: book.description.clone(),
            published_year: book.published_year,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: Option<&String>,
) {
    if let Some(value) = value {
        if value.trim().is_empty() {
            errors.add(field, format!("{label} is required"));
        }
    }
}

fn check_year(errors: &mut ValidationErrors, year: Option<i32>, current_year: i32) {
    if let Some(year) = year {
        if !(MIN_PUBLISHED_YEAR..=current_year).contains(&year) {
            errors.add(
                "publishedYear",
                "Published year must be between 1000 and current year",
            );
        }
    }
}

/// Search parameters as held by a session or passed as an override. Every
/// field is optional; absent fields fall back during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSearchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
}

/// Fully resolved search request, ready to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub page: u32,
    pub limit: u32,
    pub owner: Option<String>,
    pub availability: Option<Availability>,
}

impl SearchRequest {
    /// Query-string pairs; empty values are left out.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if !self.query.is_empty() {
            pairs.push(("query", self.query.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        if let Some(owner) = self.owner.as_ref().filter(|o| !o.is_empty()) {
            pairs.push(("owner", owner.clone()));
        }
        if let Some(availability) = self.availability {
            pairs.push(("availability", availability.as_str().to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        };
        Self {
            items,
            page,
            limit,
            total,
            total_pages,
        }
    }

    /// What a session shows before its first fetch lands.
    pub fn empty(limit: u32) -> Self {
        Self::new(Vec::new(), 0, 1, limit)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
