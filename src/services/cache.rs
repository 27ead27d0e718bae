//! Redis caching service for optimizing API performance.
//!
//! Type-safe caching layer with automatic serde round-tripping, configurable
//! TTL, pattern invalidation, and connection pooling via ConnectionManager.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument, warn};

/// Redis cache client with connection pooling.
///
/// The connection is established lazily on first use, so a Redis outage
/// degrades caching instead of blocking startup.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
    conn: Arc<OnceCell<ConnectionManager>>,
    default_ttl: Duration,
}

impl RedisCache {
    /// Create a new Redis cache client. Does not connect yet.
    pub fn new(redis_url: &str, default_ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        Ok(Self {
            client,
            conn: Arc::new(OnceCell::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
        })
    }

    async fn conn(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = ConnectionManager::new(self.client.clone())
                    .await
                    .context("Failed to connect to Redis")?;
                tracing::info!("Redis cache connected");
                Ok::<_, anyhow::Error>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    /// Get a value from cache.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = match self.conn().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Redis unavailable; treating as cache miss");
                return None;
            }
        };

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(value) => {
                    debug!(key = key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = key, error = %e, "Failed to deserialize cached value");
                    None
                }
            },
            Ok(None) => {
                debug!(key = key, "Cache miss");
                None
            }
            Err(e) => {
                error!(key = key, error = %e, "Redis get error");
                None
            }
        }
    }

    /// Set a value in cache with default TTL.
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// Set a value in cache with custom TTL.
    #[instrument(skip(self, value))]
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.conn().await?;

        let data = serde_json::to_string(value).context("Failed to serialize value for cache")?;

        conn.set_ex::<_, _, ()>(key, data, ttl.as_secs())
            .await
            .context("Failed to set cache value")?;

        debug!(key = key, ttl_secs = ttl.as_secs(), "Cached value");
        Ok(())
    }

    /// Delete all keys matching a pattern (e.g., "usage:123:*").
    #[instrument(skip(self))]
    pub async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.conn().await?;

        // SCAN the full keyspace; a single page would miss keys once the
        // cursor wraps past one batch.
        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn)
                .await
                .context("Redis SCAN failed")?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: i32 = conn.del(&keys).await.context("Failed to delete cache keys")?;

        debug!(pattern = pattern, deleted = deleted, "Cache pattern delete");
        Ok(deleted as usize)
    }

    /// Check if Redis is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }
}

/// Cache key builders for consistent key formats.
pub mod keys {
    use uuid::Uuid;

    /// Plan catalog with per-plan limits
    pub fn plan_catalog() -> String {
        "plans:catalog".to_string()
    }

    /// Per-user usage summary
    pub fn usage(user_id: Uuid) -> String {
        format!("usage:{}", user_id)
    }

    /// Composed white-label report payload for an audit
    pub fn report_payload(audit_id: Uuid) -> String {
        format!("report:audit:{}", audit_id)
    }

    /// Pattern to invalidate everything cached for a user
    pub fn user_pattern(user_id: Uuid) -> String {
        format!("usage:{}*", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::keys;
    use uuid::Uuid;

    #[test]
    fn key_builders_are_stable() {
        let id = Uuid::nil();
        assert_eq!(keys::plan_catalog(), "plans:catalog");
        assert_eq!(
            keys::usage(id),
            "usage:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            keys::report_payload(id),
            "report:audit:00000000-0000-0000-0000-000000000000"
        );
    }
}
