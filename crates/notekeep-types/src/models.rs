use serde::{Deserialize, Serialize};

/// A registered user. Inside the store `password` holds the Argon2 hash;
/// every value that leaves a service goes through `redacted` first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl User {
    /// The same user with the password cleared, safe to put in a response.
    pub fn redacted(self) -> Self {
        Self {
            password: String::new(),
            ..self
        }
    }
}

/// Sparse user update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    /// Build from request fields, treating empty strings as "not provided".
    pub fn from_fields(username: String, password: String) -> Self {
        Self {
            username: Some(username).filter(|s| !s.is_empty()),
            password: Some(password).filter(|s| !s.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// A note owned by exactly one author. `author_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub author_id: i64,
    pub name: String,
    pub content: String,
}

/// A note that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub author_id: i64,
    pub name: String,
    pub content: String,
}
