use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::Book;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Title,
    Creators,
    Ndc,
    Publisher,
    Location1,
    Location2,
}

impl SortKey {
    fn field<'a>(&self, book: &'a Book) -> &'a str {
        match self {
            SortKey::Title => &book.title,
            SortKey::Creators => &book.creators,
            SortKey::Ndc => &book.ndc,
            SortKey::Publisher => &book.publisher,
            SortKey::Location1 => &book.location1,
            SortKey::Location2 => &book.location2,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: SortKey,
    pub order: SortOrder,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub creators: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Sorted copy of `books`. Equal keys keep their original relative order.
pub fn sort_books(books: &[Book], config: SortConfig) -> Vec<Book> {
    let mut sorted = books.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = compare_text(config.key.field(a), config.key.field(b));
        match config.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    sorted
}

fn contains_ignoring_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// Books matching every criterion present in `search`. Tag ids are conjunctive.
pub fn search_books(books: &[Book], search: &SearchConfig) -> Vec<Book> {
    books
        .iter()
        .filter(|book| {
            contains_ignoring_case(&book.title, search.title.as_deref())
                && contains_ignoring_case(&book.publisher, search.publisher.as_deref())
                && contains_ignoring_case(&book.creators, search.creators.as_deref())
                && search.tag_ids.iter().all(|tag_id| book.has_tag(*tag_id))
        })
        .cloned()
        .collect()
}
