use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{Book, DeleteOutcome, NewBook, Tag};
use crate::tags;

pub(crate) const BOOK_COLUMNS: &str = "books.id, books.isbn, books.title, books.title_ruby, \
     books.alt_title, books.alt_title_ruby, books.series, books.series_ruby, books.creators, \
     books.publisher, books.date, books.price, books.pages, books.ndc, books.location1, \
     books.location2, books.url";

/// Map a row selected with [`BOOK_COLUMNS`]; tags are filled in by [`hydrate_tags`].
pub(crate) fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        isbn: row.get(1)?,
        title: row.get(2)?,
        title_ruby: row.get(3)?,
        alt_title: row.get(4)?,
        alt_title_ruby: row.get(5)?,
        series: row.get(6)?,
        series_ruby: row.get(7)?,
        creators: row.get(8)?,
        publisher: row.get(9)?,
        date: row.get(10)?,
        price: row.get(11)?,
        pages: row.get(12)?,
        ndc: row.get(13)?,
        location1: row.get(14)?,
        location2: row.get(15)?,
        url: row.get(16)?,
        tags: vec![],
    })
}

/// Attach tag lists with a single join instead of one query per book.
pub(crate) fn hydrate_tags(conn: &Connection, books: &mut [Book]) -> Result<()> {
    if books.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT book_tags.book_id, tags.id, tags.name \
         FROM book_tags \
         JOIN tags ON tags.id = book_tags.tag_id \
         ORDER BY book_tags.book_id, tags.id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            Tag {
                id: row.get(1)?,
                name: row.get(2)?,
            },
        ))
    })?;

    let mut by_book: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        let (book_id, tag) = row?;
        by_book.entry(book_id).or_default().push(tag);
    }
    for book in books.iter_mut() {
        book.tags = by_book.remove(&book.id).unwrap_or_default();
    }
    Ok(())
}

/// Insert a book and link it to `tag_names`, creating tags on demand.
///
/// The book row and every tag step share one transaction: if any tag step fails the
/// whole call is rolled back and the error is returned.
pub fn create_book(conn: &Connection, book: &NewBook, tag_names: &[String]) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO books (isbn, title, title_ruby, alt_title, alt_title_ruby, series, \
         series_ruby, creators, publisher, date, price, pages, ndc, location1, location2, url) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            book.isbn,
            book.title,
            book.title_ruby,
            book.alt_title,
            book.alt_title_ruby,
            book.series,
            book.series_ruby,
            book.creators,
            book.publisher,
            book.date,
            book.price,
            book.pages,
            book.ndc,
            book.location1,
            book.location2,
            book.url,
        ],
    )?;
    let book_id = tx.last_insert_rowid();

    for name in tag_names {
        let tag = tags::create_tag(&tx, name)?;
        tags::link_book_tag(&tx, book_id, tag.id)?;
    }

    tx.commit()?;
    log::info!(
        "added book id={} isbn={} tags={}",
        book_id,
        book.isbn,
        tag_names.len()
    );
    Ok(book_id)
}

pub fn get_book(conn: &Connection, id: i64) -> Result<Option<Book>> {
    let sql = format!("SELECT {} FROM books WHERE books.id = ?1", BOOK_COLUMNS);
    let book = conn
        .query_row(&sql, params![id], book_from_row)
        .optional()?;
    match book {
        Some(mut book) => {
            book.tags = tags::tags_for_book(conn, book.id)?;
            Ok(Some(book))
        }
        None => Ok(None),
    }
}

pub fn list_books(conn: &Connection) -> Result<Vec<Book>> {
    let sql = format!("SELECT {} FROM books ORDER BY books.id", BOOK_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], book_from_row)?;
    let mut books = Vec::new();
    for row in rows {
        books.push(row?);
    }
    hydrate_tags(conn, &mut books)?;
    Ok(books)
}

/// Remove a book and its tag links. `changes` counts removed book rows.
pub fn delete_book(conn: &Connection, id: i64) -> Result<DeleteOutcome> {
    let tx = conn.unchecked_transaction()?;
    let links = tx.execute("DELETE FROM book_tags WHERE book_id = ?1", params![id])?;
    let changes = tx.execute("DELETE FROM books WHERE id = ?1", params![id])?;
    tx.commit()?;

    log::info!(
        "deleted book id={} rows={} tag_links={}",
        id,
        changes,
        links
    );
    Ok(DeleteOutcome { changes })
}

/// Overwrite the two shelf labels. Returns false when no book has `id`.
pub fn update_book_location(
    conn: &Connection,
    id: i64,
    location1: &str,
    location2: &str,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE books SET location1 = ?1, location2 = ?2 WHERE id = ?3",
        params![location1, location2, id],
    )?;
    if updated == 0 {
        log::debug!("location update for unknown book id={}", id);
    }
    Ok(updated > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::error::CatalogError;
    use std::collections::BTreeSet;

    fn sample(isbn: &str) -> NewBook {
        NewBook {
            isbn: isbn.to_string(),
            title: "情報科学入門".to_string(),
            title_ruby: "ジョウホウ カガク ニュウモン".to_string(),
            creators: "山田太郎, 鈴木花子".to_string(),
            publisher: "技術評論社".to_string(),
            date: "2019.3".to_string(),
            price: 2400,
            pages: "311p ; 21cm".to_string(),
            ndc: "007.6".to_string(),
            url: format!("https://ndlsearch.ndl.go.jp/books/{}", isbn),
            ..NewBook::default()
        }
    }

    fn tag_names(book: &Book) -> BTreeSet<String> {
        book.tags.iter().map(|tag| tag.name.clone()).collect()
    }

    #[test]
    fn create_then_list_round_trips_fields_and_tags() {
        let conn = open_in_memory().unwrap();
        let fields = sample("9784000000001");
        let id = create_book(
            &conn,
            &fields,
            &["textbook".to_string(), "computing".to_string()],
        )
        .unwrap();

        let books = list_books(&conn).unwrap();
        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.id, id);
        assert_eq!(
            Book::from_new(id, fields, book.tags.clone()),
            book.clone()
        );
        assert_eq!(
            tag_names(book),
            BTreeSet::from(["computing".to_string(), "textbook".to_string()])
        );
    }

    #[test]
    fn tag_order_and_reuse_do_not_change_the_result() {
        let conn = open_in_memory().unwrap();
        tags::create_tag(&conn, "b").unwrap();
        let first = create_book(&conn, &sample("1"), &["a".to_string(), "b".to_string()]).unwrap();
        let second = create_book(&conn, &sample("2"), &["b".to_string(), "a".to_string()]).unwrap();

        let first = get_book(&conn, first).unwrap().unwrap();
        let second = get_book(&conn, second).unwrap().unwrap();
        assert_eq!(tag_names(&first), tag_names(&second));
        assert_eq!(tags::list_tags(&conn).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_tag_names_link_once() {
        let conn = open_in_memory().unwrap();
        let id = create_book(&conn, &sample("1"), &["x".to_string(), "x".to_string()]).unwrap();
        assert_eq!(tags::tags_for_book(&conn, id).unwrap().len(), 1);
    }

    #[test]
    fn failing_tag_step_rolls_back_the_book() {
        let conn = open_in_memory().unwrap();
        let err = create_book(&conn, &sample("1"), &["ok".to_string(), " ".to_string()]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
        assert!(list_books(&conn).unwrap().is_empty());
        assert!(tags::list_tags(&conn).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_links_and_row() {
        let conn = open_in_memory().unwrap();
        let gone = create_book(&conn, &sample("1"), &["shared".to_string()]).unwrap();
        let kept = create_book(&conn, &sample("2"), &["shared".to_string()]).unwrap();

        let outcome = delete_book(&conn, gone).unwrap();
        assert_eq!(outcome.changes, 1);
        assert!(tags::tags_for_book(&conn, gone).unwrap().is_empty());

        let remaining: Vec<i64> = list_books(&conn).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(remaining, vec![kept]);
        assert!(get_book(&conn, gone).unwrap().is_none());
        // Tags are never garbage-collected.
        assert_eq!(tags::list_tags(&conn).unwrap().len(), 1);
    }

    #[test]
    fn deleting_unknown_id_reports_zero_changes() {
        let conn = open_in_memory().unwrap();
        assert_eq!(delete_book(&conn, 77).unwrap().changes, 0);
    }

    #[test]
    fn update_location_touches_only_locations() {
        let conn = open_in_memory().unwrap();
        let id = create_book(&conn, &sample("1"), &["t".to_string()]).unwrap();
        let before = get_book(&conn, id).unwrap().unwrap();

        assert!(update_book_location(&conn, id, "Study", "Shelf 3").unwrap());

        let after = get_book(&conn, id).unwrap().unwrap();
        assert_eq!(after.location1, "Study");
        assert_eq!(after.location2, "Shelf 3");
        let restored = Book {
            location1: before.location1.clone(),
            location2: before.location2.clone(),
            ..after
        };
        assert_eq!(restored, before);
    }

    #[test]
    fn update_location_of_unknown_book_is_a_no_op() {
        let conn = open_in_memory().unwrap();
        assert!(!update_book_location(&conn, 5, "a", "b").unwrap());
        assert!(list_books(&conn).unwrap().is_empty());
    }
}
