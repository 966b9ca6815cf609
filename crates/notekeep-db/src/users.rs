use std::path::Path;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use notekeep_crypto::{hash_password, verify_password};
use notekeep_types::models::{User, UserChanges};
use tracing::{error, info};

use crate::{Database, StoreError, blocking, migrations};

/// Everything the auth handlers need from a user backend.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Hash `password` and insert a new user.
    async fn create(&self, username: &str, password: &str) -> Result<User, StoreError>;

    async fn read(&self, id: i64) -> Result<User, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Apply a sparse update. An empty change set succeeds without touching the row.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<(), StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Look up `username` and check `password`. Unknown users and wrong
    /// passwords both fail with `StoreError::InvalidCredentials`.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

/// Verified against when the username does not exist, so that a miss costs
/// the same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("notekeep-missing-user").ok());

pub struct SqliteUserStore {
    db: Arc<Database>,
}

impl SqliteUserStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::with_database(Database::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_database(Database::open_in_memory()?)
    }

    fn with_database(db: Database) -> Result<Self, StoreError> {
        db.with_conn(migrations::run_users)?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create(&self, username: &str, password: &str) -> Result<User, StoreError> {
        if username.is_empty() || password.is_empty() {
            return Err(StoreError::InvalidData(
                "username and password are required".into(),
            ));
        }

        let username = username.to_string();
        let password = password.to_string();
        blocking(&self.db, move |db| {
            let hash = hash_password(&password)?;
            let row = db.create_user(&username, &hash)?;
            info!(user_id = row.id, "user created");
            Ok(row.into())
        })
        .await
    }

    async fn read(&self, id: i64) -> Result<User, StoreError> {
        if id <= 0 {
            return Err(StoreError::NotFound);
        }

        blocking(&self.db, move |db| {
            db.get_user_by_id(id)?
                .map(User::from)
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<User, StoreError> {
        if username.is_empty() {
            return Err(StoreError::InvalidData("username is required".into()));
        }

        let username = username.to_string();
        blocking(&self.db, move |db| {
            db.get_user_by_username(&username)?
                .map(User::from)
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<(), StoreError> {
        if id <= 0 {
            return Err(StoreError::InvalidData("user id must be positive".into()));
        }
        if changes.is_empty() {
            return Ok(());
        }

        blocking(&self.db, move |db| {
            let password_hash = changes.password.as_deref().map(hash_password).transpose()?;
            let matched =
                db.update_user(id, changes.username.as_deref(), password_hash.as_deref())?;
            if matched == 0 {
                return Err(StoreError::NotFound);
            }
            info!(user_id = id, "user updated");
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id <= 0 {
            return Err(StoreError::NotFound);
        }

        blocking(&self.db, move |db| {
            if db.delete_user(id)? == 0 {
                return Err(StoreError::NotFound);
            }
            info!(user_id = id, "user deleted");
            Ok(())
        })
        .await
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, StoreError> {
        if username.is_empty() || password.is_empty() {
            return Err(StoreError::InvalidCredentials);
        }

        let username = username.to_string();
        let password = password.to_string();
        blocking(&self.db, move |db| {
            let Some(row) = db.get_user_by_username(&username)? else {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(&password, dummy);
                }
                return Err(StoreError::InvalidCredentials);
            };

            match verify_password(&password, &row.password) {
                Ok(true) => Ok(row.into()),
                Ok(false) => Err(StoreError::InvalidCredentials),
                Err(e) => {
                    error!(user_id = row.id, "unusable password hash: {}", e);
                    Err(StoreError::InvalidCredentials)
                }
            }
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        blocking(&self.db, |db| db.close()).await
    }
}
