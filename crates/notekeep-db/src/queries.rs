use crate::models::{NoteRow, UserRow};
use crate::{Database, StoreError};
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    /// Insert a user and return the stored row. `password_hash` must already be hashed.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRow, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            )?;
            let id = conn.last_insert_rowid();
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Apply a sparse update. `None` columns keep their value.
    /// Returns the number of rows matched.
    pub fn update_user(
        &self,
        id: i64,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET username = COALESCE(?2, username),
                     password = COALESCE(?3, password),
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, username, password_hash],
            )?;
            Ok(changed)
        })
    }

    pub fn delete_user(&self, id: i64) -> Result<usize, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])?))
    }

    // -- Notes --

    pub fn insert_note(
        &self,
        id: &str,
        author_id: i64,
        name: &str,
        content: &str,
    ) -> Result<NoteRow, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (id, author_id, name, content) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, author_id, name, content],
            )?;
            query_note_by_id(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    pub fn get_note(&self, id: &str) -> Result<Option<NoteRow>, StoreError> {
        self.with_conn(|conn| query_note_by_id(conn, id))
    }

    pub fn get_notes_by_author(&self, author_id: i64) -> Result<Vec<NoteRow>, StoreError> {
        self.with_conn(|conn| query_notes_by_author(conn, author_id))
    }

    /// Replace a note's name and content. Returns the number of rows matched.
    pub fn update_note(&self, id: &str, name: &str, content: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notes SET name = ?2, content = ?3 WHERE id = ?1",
                rusqlite::params![id, name, content],
            )?;
            Ok(changed)
        })
    }

    pub fn delete_note(&self, id: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM notes WHERE id = ?1", [id])?))
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        name: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE id = ?1")?;
    Ok(stmt.query_row([id], user_from_row).optional()?)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;
    Ok(stmt.query_row([username], user_from_row).optional()?)
}

fn query_note_by_id(conn: &Connection, id: &str) -> Result<Option<NoteRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id, author_id, name, content, created_at FROM notes WHERE id = ?1")?;
    Ok(stmt.query_row([id], note_from_row).optional()?)
}

fn query_notes_by_author(conn: &Connection, author_id: i64) -> Result<Vec<NoteRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, author_id, name, content, created_at
         FROM notes
         WHERE author_id = ?1
         ORDER BY created_at, rowid",
    )?;

    let rows = stmt
        .query_map([author_id], note_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
