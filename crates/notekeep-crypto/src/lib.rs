//! Notekeep credential hashing
//!
//! Passwords are stored only as Argon2id PHC strings with a per-record
//! random salt. Callers never see or persist plaintext after `hash_password`.

pub mod password;

pub use password::{PasswordError, hash_password, verify_password};
