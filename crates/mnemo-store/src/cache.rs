//! Redis-backed cache layer
//!
//! Query-result cache, recent-document window and the entity↔document
//! reverse index. Every write here is best-effort from the caller's
//! point of view: the engine must stay correct with an empty cache.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::traits::CacheStore;

/// Cache key builders and TTLs, one entry per key family
pub mod keys {
    /// TTL for raw document content (`doc:{id}`)
    pub const DOC_TTL_SECS: u64 = 3600;
    /// TTL for comma-joined keywords (`keywords:{id}`)
    pub const KEYWORDS_TTL_SECS: u64 = 3600;
    /// TTL for a document's entity tokens (`doc_entities:{id}`)
    pub const DOC_ENTITIES_TTL_SECS: u64 = 86_400;
    /// TTL for the entity→documents reverse list (`entity_docs:{token}`)
    pub const ENTITY_DOCS_TTL_SECS: u64 = 86_400;
    /// TTL for content previews (`recent:{id}`)
    pub const RECENT_PREVIEW_TTL_SECS: u64 = 3600;
    /// TTL for cached query results (`query_cache:{hash}`)
    pub const QUERY_CACHE_TTL_SECS: u64 = 3600;
    /// Longer TTL used by cache warm-up
    pub const WARMUP_TTL_SECS: u64 = 7200;
    /// TTL for query frequency counters (`query_hash:{hash}`)
    pub const QUERY_HASH_TTL_SECS: u64 = 86_400;
    /// TTL for the query history ring buffer
    pub const QUERY_HISTORY_TTL_SECS: u64 = 86_400;
    /// TTL for prefetch markers (`prefetch:{id}`)
    pub const PREFETCH_TTL_SECS: u64 = 1800;

    /// Recent-document window size, entries beyond it are trimmed
    pub const RECENT_WINDOW: usize = 100;
    /// Documents kept per entity in the reverse index
    pub const ENTITY_DOCS_CAP: usize = 100;
    /// Query history ring buffer length
    pub const QUERY_HISTORY_CAP: usize = 100;
    /// Content preview size for `recent:{id}`
    pub const PREVIEW_LIMIT: usize = 5 * 1024;

    pub fn doc(id: &str) -> String {
        format!("doc:{}", id)
    }

    pub fn keywords(id: &str) -> String {
        format!("keywords:{}", id)
    }

    pub fn doc_entities(id: &str) -> String {
        format!("doc_entities:{}", id)
    }

    pub fn entity_docs(token: &str) -> String {
        format!("entity_docs:{}", token)
    }

    pub fn recent_preview(id: &str) -> String {
        format!("recent:{}", id)
    }

    /// The recent-documents sorted set, scored by wall-clock seconds
    pub const RECENT_DOCS: &str = "recent:docs";

    /// Query result cache keyed on the first 12 hex chars of the MD5 of
    /// the normalised query
    pub fn query_cache(query: &str) -> String {
        let digest = md5::compute(normalise_query(query).as_bytes());
        let hex = format!("{:x}", digest);
        format!("query_cache:{}", &hex[..12])
    }

    /// Query frequency counter keyed on the full MD5 of the normalised
    /// query
    pub fn query_hash(query: &str) -> String {
        let digest = md5::compute(normalise_query(query).as_bytes());
        format!("query_hash:{:x}", digest)
    }

    pub const QUERY_HISTORY: &str = "query_history";

    pub fn prefetch(id: &str) -> String {
        format!("prefetch:{}", id)
    }

    /// Normalise a query for hashing: trim and lowercase
    pub fn normalise_query(query: &str) -> String {
        query.trim().to_lowercase()
    }
}

/// Configuration for the Redis cache connection
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Redis client implementing [`CacheStore`]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis and probe with PING
    pub async fn connect(config: RedisCacheConfig) -> Result<Self> {
        info!("Connecting to Redis at {}", config.url);

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(format!("Invalid Redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        let cache = Self { conn };
        if !cache.health().await {
            return Err(StoreError::Connection(
                "Redis did not answer PING".to_string(),
            ));
        }

        info!("Successfully connected to Redis");
        Ok(cache)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl_secs {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let found: Vec<String> = conn.keys(pattern).await?;
        Ok(found)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("ZREVRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn ztrim_to(&self, key: &str, max: usize) -> Result<()> {
        let mut conn = self.conn.clone();
        // Drop everything below the top `max` scores
        let stop = -(max as isize) - 1;
        let _: () = redis::cmd("ZREMRANGEBYRANK")
            .arg(key)
            .arg(0)
            .arg(stop)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str, ttl_secs: u64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1).await?;
        let _: () = conn.expire(key, ttl_secs as i64).await?;
        Ok(value)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    async fn health(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: std::result::Result<String, redis::RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => true,
            Err(e) => {
                warn!("Redis health check failed: {}", e);
                false
            }
        }
    }
}
