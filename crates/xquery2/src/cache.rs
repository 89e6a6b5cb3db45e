//! Key-value cache abstraction with optional TTL.
//!
//! Values are opaque: callers serialize to/from JSON themselves (`serde_json` is
//! already pulled in everywhere else the crate needs wire/storage serialization), so
//! the cache layer only ever moves `String` blobs around rather than pulling in a
//! separate binary serialization format.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::sync::Cache as MokaCache;
use redis::AsyncCommands;

/// Mapping from string key to an opaque serialized value with optional TTL.
///
/// A missing key resolves to `Ok(None)`, never an error; only transport/backend
/// failures (a dead Redis connection) surface as `Err`.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> anyhow::Result<()>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
    async fn flush(&self) -> anyhow::Result<()>;
}

/// No-op cache for tests: every `get` misses, every `set`/`remove`/`flush` succeeds
/// silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCache;

#[async_trait]
impl Cache for NoOpCache {
    async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn remove(&self, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// Per-process in-memory cache, unbounded, honoring per-entry TTL. Backed by `moka`,
/// same as the entity repository's memoized reads (see `db::repository`).
pub struct InMemoryCache {
    store: MokaCache<String, ()>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self { store: MokaCache::builder().build(), entries: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> anyhow::Result<()> {
        self.store.insert(key.to_string(), ());
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.entries.lock().unwrap().insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|t| Instant::now() >= t) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(key);
        self.store.invalidate(key);
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.entries.lock().unwrap().clear();
        self.store.invalidate_all();
        Ok(())
    }
}

/// Shared networked cache backed by Redis; races between writers are resolved by
/// last-write-wins, with staleness bounded by TTL.
#[derive(Clone)]
pub struct RedisCache {
    manager: redis::aio::ConnectionManager,
}

impl RedisCache {
    pub async fn connect(host: &str, port: u16, password: Option<&str>, db: u32) -> anyhow::Result<Self> {
        let mut url = format!("redis://{host}:{port}/{db}");
        if let Some(password) = password {
            url = format!("redis://:{password}@{host}:{port}/{db}");
        }
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}
