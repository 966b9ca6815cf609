//! Notekeep cache clients
//!
//! A small string key/value capability with per-entry TTL. The notes service
//! uses it for per-author read-through caching; it is never the source of truth.

pub mod error;
pub mod memory;
pub mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;

pub use error::CacheError;
pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

#[async_trait]
pub trait Cache: Send + Sync {
    /// `Ok(None)` on a miss or an expired entry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn close(&self) -> Result<(), CacheError>;
}
