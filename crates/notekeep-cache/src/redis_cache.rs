use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::info;

use crate::{Cache, CacheError};

/// Redis-backed cache. `ConnectionManager` reconnects on its own and is cheap
/// to clone, so each call works on its own handle.
pub struct RedisCache {
    conn: ConnectionManager,
    closed: AtomicBool,
}

impl RedisCache {
    /// Connect and ping once so a bad address fails at boot, not on the first request.
    pub async fn connect(host: &str, port: u16, password: Option<&str>) -> Result<Self, CacheError> {
        let client = redis::Client::open(connection_info(host, port, password))?;
        let mut conn = ConnectionManager::new(client).await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Connected to Redis");

        Ok(Self {
            conn,
            closed: AtomicBool::new(false),
        })
    }

    fn handle(&self) -> Result<ConnectionManager, CacheError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed);
        }
        Ok(self.conn.clone())
    }
}

/// Built field by field so the password is passed verbatim, never through a URL.
fn connection_info(host: &str, port: u16, password: Option<&str>) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(host.to_string(), port),
        redis: RedisConnectionInfo {
            password: password.map(str::to_string),
            ..Default::default()
        },
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.handle()?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.handle()?;
        // SETEX rejects a zero expiry.
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.handle()?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.closed.store(true, Ordering::Release);
        info!("Redis cache closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_with_url_characters_survives() {
        let info = connection_info("cache.local", 6380, Some("p@ss/w:rd#1"));
        assert_eq!(info.redis.password.as_deref(), Some("p@ss/w:rd#1"));
        assert_eq!(info.redis.db, 0);
        match &info.addr {
            ConnectionAddr::Tcp(host, port) => {
                assert_eq!(host, "cache.local");
                assert_eq!(*port, 6380);
            }
            other => panic!("unexpected address {other:?}"),
        }
    }

    #[test]
    fn no_password_means_no_auth() {
        let info = connection_info("localhost", 6379, None);
        assert!(info.redis.password.is_none());
        assert!(info.redis.username.is_none());
    }
}
