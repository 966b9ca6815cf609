use notekeep_crypto::PasswordError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("store is closed")]
    Closed,

    #[error("store call exceeded the request deadline")]
    Timeout,

    #[error("store call was cancelled before it ran")]
    Cancelled,

    #[error(transparent)]
    Sqlite(rusqlite::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::AlreadyExists
            }
            _ => Self::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (
                id   INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                n    INTEGER CHECK (n > 0)
            );
            INSERT INTO t (id, name, n) VALUES (1, 'a', 1);",
        )
        .unwrap();
        conn
    }

    fn insert(conn: &Connection, sql: &str) -> StoreError {
        conn.execute(sql, []).map(|_| ()).map_err(StoreError::from).unwrap_err()
    }

    #[test]
    fn only_uniqueness_conflicts_are_already_exists() {
        let conn = table();

        assert!(matches!(
            insert(&conn, "INSERT INTO t (id, name, n) VALUES (2, 'a', 1)"),
            StoreError::AlreadyExists
        ));
        assert!(matches!(
            insert(&conn, "INSERT INTO t (id, name, n) VALUES (1, 'b', 1)"),
            StoreError::AlreadyExists
        ));
        assert!(matches!(
            insert(&conn, "INSERT INTO t (id, name, n) VALUES (3, NULL, 1)"),
            StoreError::Sqlite(_)
        ));
        assert!(matches!(
            insert(&conn, "INSERT INTO t (id, name, n) VALUES (4, 'd', 0)"),
            StoreError::Sqlite(_)
        ));
    }
}
