//! Database row types that map directly to SQLite rows.
//! Distinct from notekeep-types models to keep the DB layer independent.

use notekeep_types::models::{Note, User};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct NoteRow {
    pub id: String,
    pub author_id: i64,
    pub name: String,
    pub content: String,
    pub created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password: row.password,
        }
    }
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            name: row.name,
            content: row.content,
        }
    }
}
