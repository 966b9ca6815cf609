use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use notekeep_types::models::{NewNote, Note};
use uuid::Uuid;

use crate::{Database, StoreError, blocking, migrations};

/// Document-style note persistence consumed by the notes service.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a note and assign it a fresh id.
    async fn create(&self, note: NewNote) -> Result<Note, StoreError>;

    async fn get(&self, id: &str) -> Result<Note, StoreError>;

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Note>, StoreError>;

    /// Replace `name` and `content`; `author_id` is never touched.
    async fn update(&self, id: &str, name: &str, content: &str) -> Result<Note, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

pub struct SqliteNoteStore {
    db: Arc<Database>,
}

impl SqliteNoteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::with_database(Database::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_database(Database::open_in_memory()?)
    }

    fn with_database(db: Database) -> Result<Self, StoreError> {
        db.with_conn(migrations::run_notes)?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn create(&self, note: NewNote) -> Result<Note, StoreError> {
        let id = Uuid::new_v4().to_string();
        blocking(&self.db, move |db| {
            db.insert_note(&id, note.author_id, &note.name, &note.content)
                .map(Note::from)
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Note, StoreError> {
        let id = id.to_string();
        blocking(&self.db, move |db| {
            db.get_note(&id)?.map(Note::from).ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Note>, StoreError> {
        blocking(&self.db, move |db| {
            Ok(db
                .get_notes_by_author(author_id)?
                .into_iter()
                .map(Note::from)
                .collect())
        })
        .await
    }

    async fn update(&self, id: &str, name: &str, content: &str) -> Result<Note, StoreError> {
        let (id, name, content) = (id.to_string(), name.to_string(), content.to_string());
        blocking(&self.db, move |db| {
            if db.update_note(&id, &name, &content)? == 0 {
                return Err(StoreError::NotFound);
            }
            db.get_note(&id)?.map(Note::from).ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        blocking(&self.db, move |db| {
            if db.delete_note(&id)? == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        blocking(&self.db, |db| db.close()).await
    }
}
