use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::books::{self, BOOK_COLUMNS};
use crate::error::{is_constraint_violation, CatalogError, Result};
use crate::models::{Book, Tag};

fn find_tag_by_name(conn: &Connection, name: &str) -> Result<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name FROM tags WHERE name = ?1",
            params![name],
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(tag)
}

/// Create a tag, or hand back the existing one with the same name.
pub fn create_tag(conn: &Connection, name: &str) -> Result<Tag> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidInput(
            "Tag name cannot be empty".to_string(),
        ));
    }

    if let Some(existing) = find_tag_by_name(conn, trimmed)? {
        return Ok(existing);
    }

    match conn.execute("INSERT INTO tags (name) VALUES (?1)", params![trimmed]) {
        Ok(_) => Ok(Tag {
            id: conn.last_insert_rowid(),
            name: trimmed.to_string(),
        }),
        Err(err) if is_constraint_violation(&err) => {
            // Lost the race against another writer; theirs is the tag.
            log::debug!("tag \"{}\" created concurrently, re-reading", trimmed);
            find_tag_by_name(conn, trimmed)?.ok_or(CatalogError::Storage(err))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name, id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    let mut tags = Vec::new();
    for row in rows {
        tags.push(row?);
    }
    Ok(tags)
}

pub fn tags_for_book(conn: &Connection, book_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT tags.id, tags.name FROM tags \
         JOIN book_tags ON tags.id = book_tags.tag_id \
         WHERE book_tags.book_id = ?1 \
         ORDER BY tags.id",
    )?;
    let rows = stmt.query_map(params![book_id], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    let mut tags = Vec::new();
    for row in rows {
        tags.push(row?);
    }
    Ok(tags)
}

/// Link a book to a tag. Linking an already linked pair succeeds without a new row.
pub fn link_book_tag(conn: &Connection, book_id: i64, tag_id: i64) -> Result<()> {
    match conn.execute(
        "INSERT OR IGNORE INTO book_tags (book_id, tag_id) VALUES (?1, ?2)",
        params![book_id, tag_id],
    ) {
        Ok(_) => Ok(()),
        Err(err) if is_constraint_violation(&err) => Err(CatalogError::Constraint(format!(
            "book {} or tag {} does not exist",
            book_id, tag_id
        ))),
        Err(err) => Err(err.into()),
    }
}

pub fn unlink_book_tag(conn: &Connection, book_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM book_tags WHERE book_id = ?1 AND tag_id = ?2",
        params![book_id, tag_id],
    )?;
    Ok(())
}

/// Books linked to every id in `tag_ids`. An empty filter matches all books.
pub fn books_matching_all_tags(conn: &Connection, tag_ids: &[i64]) -> Result<Vec<Book>> {
    let mut wanted = tag_ids.to_vec();
    wanted.sort_unstable();
    wanted.dedup();
    if wanted.is_empty() {
        return books::list_books(conn);
    }

    let placeholders = vec!["?"; wanted.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM books \
         JOIN book_tags ON book_tags.book_id = books.id \
         WHERE book_tags.tag_id IN ({}) \
         GROUP BY books.id \
         HAVING COUNT(DISTINCT book_tags.tag_id) = ? \
         ORDER BY books.id",
        BOOK_COLUMNS, placeholders
    );

    let required = wanted.len() as i64;
    let bind = wanted.iter().copied().chain(std::iter::once(required));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind), books::book_from_row)?;
    let mut found = Vec::new();
    for row in rows {
        found.push(row?);
    }
    books::hydrate_tags(conn, &mut found)?;
    Ok(found)
}
