use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Book fields as they come out of a lookup, before the store assigns an id.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    #[serde(default)]
    pub title_ruby: String,
    #[serde(default)]
    pub alt_title: String,
    #[serde(default)]
    pub alt_title_ruby: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub series_ruby: String,
    pub creators: String,
    pub publisher: String,
    pub date: String,
    #[serde(default)]
    pub price: i64,
    pub pages: String,
    #[serde(default)]
    pub ndc: String,
    #[serde(default)]
    pub location1: String,
    #[serde(default)]
    pub location2: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub isbn: String,
    pub title: String,
    pub title_ruby: String,
    pub alt_title: String,
    pub alt_title_ruby: String,
    pub series: String,
    pub series_ruby: String,
    pub creators: String,
    pub publisher: String,
    pub date: String,
    pub price: i64,
    pub pages: String,
    pub ndc: String,
    pub location1: String,
    pub location2: String,
    pub url: String,
    pub tags: Vec<Tag>,
}

impl Book {
    pub fn from_new(id: i64, fields: NewBook, tags: Vec<Tag>) -> Self {
        Book {
            id,
            isbn: fields.isbn,
            title: fields.title,
            title_ruby: fields.title_ruby,
            alt_title: fields.alt_title,
            alt_title_ruby: fields.alt_title_ruby,
            series: fields.series,
            series_ruby: fields.series_ruby,
            creators: fields.creators,
            publisher: fields.publisher,
            date: fields.date,
            price: fields.price,
            pages: fields.pages,
            ndc: fields.ndc,
            location1: fields.location1,
            location2: fields.location2,
            url: fields.url,
            tags,
        }
    }

    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tags.iter().any(|tag| tag.id == tag_id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub changes: usize,
}
