//! Read-through caching of each author's note list.
//!
//! The store is the source of truth. One cache entry per author holds the
//! JSON array returned by the last list; any successful mutation of that
//! author's notes deletes the entry, as does one that timed out with an
//! unknown outcome. Cache failures are logged and never fail the request.

use std::sync::Arc;
use std::time::Duration;

use notekeep_cache::Cache;
use notekeep_db::{NoteStore, StoreError};
use notekeep_types::deadline::Deadline;
use notekeep_types::models::{NewNote, Note};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::timeout::store_call;

pub const NOTES_CACHE_TTL: Duration = Duration::from_secs(100 * 60);

const INVALIDATE_GRACE: Duration = Duration::from_secs(1);

pub fn author_key(author_id: i64) -> String {
    format!("notes:author:{author_id}")
}

pub struct CachedNotes {
    store: Arc<dyn NoteStore>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CachedNotes {
    pub fn new(store: Arc<dyn NoteStore>, cache: Arc<dyn Cache>) -> Self {
        Self {
            store,
            cache,
            ttl: NOTES_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn list(&self, author_id: i64, deadline: &Deadline) -> Result<Vec<Note>, ApiError> {
        if let Some(notes) = self.cached(author_id, deadline).await {
            debug!(author_id, count = notes.len(), "note list served from cache");
            return Ok(notes);
        }

        let notes = store_call(deadline, self.store.list_by_author(author_id))
            .await
            .map_err(ApiError::database)?;

        self.fill(author_id, &notes, deadline).await;
        Ok(notes)
    }

    pub async fn create(
        &self,
        author_id: i64,
        name: String,
        content: String,
        deadline: &Deadline,
    ) -> Result<Note, ApiError> {
        let new = NewNote {
            author_id,
            name,
            content,
        };
        let note = match store_call(deadline, self.store.create(new)).await {
            Ok(note) => note,
            Err(StoreError::Timeout) => return Err(self.timed_out(author_id).await),
            Err(e) => return Err(ApiError::NoteCreation(e.to_string())),
        };

        self.invalidate(author_id, deadline).await;
        Ok(note)
    }

    pub async fn get(&self, id: &str, caller: i64, deadline: &Deadline) -> Result<Note, ApiError> {
        self.owned(id, caller, deadline).await
    }

    /// Replace name and content of a note the caller owns.
    pub async fn update(
        &self,
        id: &str,
        caller: i64,
        name: &str,
        content: &str,
        deadline: &Deadline,
    ) -> Result<Note, ApiError> {
        let existing = self.owned(id, caller, deadline).await?;
        self.replace(&existing, name, content, deadline).await
    }

    /// Replace name and content of `existing`, already checked by `get`.
    pub async fn replace(
        &self,
        existing: &Note,
        name: &str,
        content: &str,
        deadline: &Deadline,
    ) -> Result<Note, ApiError> {
        let update = self.store.update(&existing.id, name, content);
        let note = match store_call(deadline, update).await {
            Ok(note) => note,
            Err(StoreError::NotFound) => return Err(ApiError::NoteNotFound),
            Err(StoreError::Timeout) => return Err(self.timed_out(existing.author_id).await),
            Err(e) => return Err(ApiError::NoteUpdate(e.to_string())),
        };

        self.invalidate(existing.author_id, deadline).await;
        Ok(note)
    }

    pub async fn delete(&self, id: &str, caller: i64, deadline: &Deadline) -> Result<(), ApiError> {
        let existing = self.owned(id, caller, deadline).await?;

        match store_call(deadline, self.store.delete(id)).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(ApiError::NoteNotFound),
            Err(StoreError::Timeout) => return Err(self.timed_out(existing.author_id).await),
            Err(e) => return Err(ApiError::NoteDeletion(e.to_string())),
        }

        self.invalidate(existing.author_id, deadline).await;
        Ok(())
    }

    /// Drop the cached list for `author_id`. Failures are logged only.
    pub async fn invalidate(&self, author_id: i64, deadline: &Deadline) {
        let key = author_key(author_id);
        match deadline.bound(self.cache.delete(&key)).await {
            Ok(Ok(())) => debug!(author_id, "note list invalidated"),
            Ok(Err(e)) => warn!(author_id, "cache invalidation failed: {}", e),
            Err(_) => warn!(author_id, "cache invalidation timed out"),
        }
    }

    /// A mutation that ran out of time may still have been applied, so the
    /// author's list is dropped on a fresh deadline before failing.
    async fn timed_out(&self, author_id: i64) -> ApiError {
        warn!(author_id, "note mutation timed out, outcome unknown");
        self.invalidate(author_id, &Deadline::after(INVALIDATE_GRACE)).await;
        ApiError::database(StoreError::Timeout)
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        if let Err(e) = self.cache.close().await {
            warn!("failed to close cache: {}", e);
        }
        self.store.close().await
    }

    /// Fetch a note and check that `caller` wrote it. Nothing is mutated
    /// before this passes.
    async fn owned(&self, id: &str, caller: i64, deadline: &Deadline) -> Result<Note, ApiError> {
        let note = store_call(deadline, self.store.get(id))
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ApiError::NoteNotFound,
                other => ApiError::database(other),
            })?;

        if note.author_id != caller {
            warn!(note_id = %id, caller, "note access denied");
            return Err(ApiError::Forbidden);
        }
        Ok(note)
    }

    async fn cached(&self, author_id: i64, deadline: &Deadline) -> Option<Vec<Note>> {
        let key = author_key(author_id);
        let raw = match deadline.bound(self.cache.get(&key)).await {
            Ok(Ok(hit)) => hit?,
            Ok(Err(e)) => {
                warn!(author_id, "cache read failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!(author_id, "cache read timed out");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(notes) => Some(notes),
            Err(e) => {
                warn!(author_id, "discarding unreadable cache entry: {}", e);
                None
            }
        }
    }

    async fn fill(&self, author_id: i64, notes: &[Note], deadline: &Deadline) {
        let raw = match serde_json::to_string(notes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(author_id, "failed to encode note list: {}", e);
                return;
            }
        };

        let key = author_key(author_id);
        match deadline.bound(self.cache.set(&key, &raw, self.ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(author_id, "cache write failed: {}", e),
            Err(_) => warn!(author_id, "cache write timed out"),
        }
    }
}
