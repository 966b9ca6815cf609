use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

/// Schema for the auth service's user database.
///
/// AUTOINCREMENT keeps ids from being reused after a delete, so an old token
/// can never resolve to a newer account.
pub fn run_users(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("User database migrations complete");
    Ok(())
}

/// Schema for the notes service's document table.
pub fn run_notes(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notes (
            id          TEXT PRIMARY KEY,
            author_id   INTEGER NOT NULL,
            name        TEXT NOT NULL,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notes_author
            ON notes(author_id);
        ",
    )?;

    info!("Note database migrations complete");
    Ok(())
}
