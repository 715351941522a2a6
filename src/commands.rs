use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::books;
use crate::error::{CatalogError, Result};
use crate::lookup::{self, LookupSource};
use crate::models::{Book, NewBook, Tag};
use crate::tags;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AddBookPayload {
    #[serde(flatten)]
    pub book: NewBook,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LocationUpdate {
    pub id: i64,
    #[serde(default)]
    pub location1: String,
    #[serde(default)]
    pub location2: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookTagPayload {
    pub book_id: i64,
    pub tag_id: i64,
}

/// Operations the host shell may invoke, as `{ "op": ..., "payload": ... }`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "op", content = "payload", rename_all = "kebab-case")]
pub enum Request {
    FetchBookData(String),
    AddBook(AddBookPayload),
    GetBooks,
    DeleteBook(i64),
    UpdateBookLocation(LocationUpdate),
    AddTag(String),
    GetAllTags,
    AddBookTag(BookTagPayload),
    RemoveBookTag(BookTagPayload),
    GetBooksByTags(Vec<i64>),
}

impl Request {
    pub fn op(&self) -> &'static str {
        match self {
            Request::FetchBookData(_) => "fetch-book-data",
            Request::AddBook(_) => "add-book",
            Request::GetBooks => "get-books",
            Request::DeleteBook(_) => "delete-book",
            Request::UpdateBookLocation(_) => "update-book-location",
            Request::AddTag(_) => "add-tag",
            Request::GetAllTags => "get-all-tags",
            Request::AddBookTag(_) => "add-book-tag",
            Request::RemoveBookTag(_) => "remove-book-tag",
            Request::GetBooksByTags(_) => "get-books-by-tags",
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Response {
    BookData(NewBook),
    Created { id: i64 },
    Books(Vec<Book>),
    Deleted { changes: usize },
    Tag(Tag),
    Tags(Vec<Tag>),
    Success { success: bool },
    Done,
}

/// The request boundary: one storage handle for the process lifetime plus a lookup source.
pub struct Catalog<S: LookupSource> {
    conn: Mutex<Connection>,
    source: S,
}

impl<S: LookupSource> Catalog<S> {
    pub fn new(conn: Connection, source: S) -> Self {
        Catalog {
            conn: Mutex::new(conn),
            source,
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|err| CatalogError::HandleUnavailable(err.to_string()))
    }

    pub fn handle(&self, request: Request) -> Result<Response> {
        let op = request.op();
        log::debug!("handling {}", op);
        self.dispatch(request).map_err(|err| {
            log::error!("Error in {}: {}", op, err);
            err
        })
    }

    fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::FetchBookData(isbn) => {
                let book = lookup::fetch_book_data(&self.source, &isbn)?;
                Ok(Response::BookData(book))
            }
            Request::AddBook(payload) => {
                let conn = self.conn()?;
                let id = books::create_book(&conn, &payload.book, &payload.tags)?;
                Ok(Response::Created { id })
            }
            Request::GetBooks => {
                let conn = self.conn()?;
                Ok(Response::Books(books::list_books(&conn)?))
            }
            Request::DeleteBook(id) => {
                let conn = self.conn()?;
                let outcome = books::delete_book(&conn, id)?;
                Ok(Response::Deleted {
                    changes: outcome.changes,
                })
            }
            Request::UpdateBookLocation(update) => {
                let conn = self.conn()?;
                books::update_book_location(
                    &conn,
                    update.id,
                    &update.location1,
                    &update.location2,
                )?;
                Ok(Response::Done)
            }
            Request::AddTag(name) => {
                let conn = self.conn()?;
                Ok(Response::Tag(tags::create_tag(&conn, &name)?))
            }
            Request::GetAllTags => {
                let conn = self.conn()?;
                Ok(Response::Tags(tags::list_tags(&conn)?))
            }
            Request::AddBookTag(link) => {
                let conn = self.conn()?;
                tags::link_book_tag(&conn, link.book_id, link.tag_id)?;
                Ok(Response::Success { success: true })
            }
            Request::RemoveBookTag(link) => {
                let conn = self.conn()?;
                tags::unlink_book_tag(&conn, link.book_id, link.tag_id)?;
                Ok(Response::Success { success: true })
            }
            Request::GetBooksByTags(tag_ids) => {
                let conn = self.conn()?;
                Ok(Response::Books(tags::books_matching_all_tags(
                    &conn, &tag_ids,
                )?))
            }
        }
    }

    /// Single book with its tags, outside the named operations.
    pub fn book(&self, id: i64) -> Result<Option<Book>> {
        let conn = self.conn()?;
        books::get_book(&conn, id)
    }

    /// Decode a JSON request and run it. Both sides come back as JSON text: the
    /// response on success, `{ kind, message }` on failure.
    pub fn handle_json(&self, raw: &str) -> std::result::Result<String, String> {
        let outcome = serde_json::from_str::<Request>(raw)
            .map_err(CatalogError::from)
            .and_then(|request| self.handle(request))
            .and_then(|response| Ok(serde_json::to_string(&response)?));
        outcome.map_err(|err| encode_error(&err))
    }
}

fn encode_error(err: &CatalogError) -> String {
    serde_json::to_string(err).unwrap_or_else(|_| {
        serde_json::json!({ "kind": err.kind(), "message": err.to_string() }).to_string()
    })
}
