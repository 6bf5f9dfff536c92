//! Redis-backed cache store.
//!
//! Cached collections live in redis sets: population is an atomic
//! delete-and-add pipeline, wildcard invalidation is `KEYS` plus `DEL`.

use redis::Commands;
use tracing::debug;

use super::{CacheStore, CacheStoreError};

pub struct RedisCacheStore {
    client: redis::Client,
}

impl RedisCacheStore {
    /// `url` is a redis connection URL, e.g. `redis://localhost:6379`.
    pub fn new(url: impl AsRef<str>) -> Result<Self, CacheStoreError> {
        let client = redis::Client::open(url.as_ref())
            .map_err(|e| CacheStoreError::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }

    fn connection(&self) -> Result<redis::Connection, CacheStoreError> {
        self.client
            .get_connection()
            .map_err(|e| CacheStoreError::Unavailable(e.to_string()))
    }
}

impl CacheStore for RedisCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheStoreError> {
        let mut con = self.connection()?;
        let exists: bool = con
            .exists(key)
            .map_err(|e| CacheStoreError::Operation(e.to_string()))?;
        if !exists {
            return Ok(None);
        }
        let members: Vec<String> = con
            .smembers(key)
            .map_err(|e| CacheStoreError::Operation(e.to_string()))?;
        Ok(Some(members))
    }

    fn put(&self, key: &str, members: &[String]) -> Result<(), CacheStoreError> {
        let mut con = self.connection()?;
        let mut pipe = redis::pipe();
        pipe.atomic().del(key);
        // An empty collection cannot be represented as a redis set; it stays
        // a miss and is recomputed on the next fetch.
        if !members.is_empty() {
            pipe.sadd(key, members);
        }
        pipe.query::<()>(&mut con)
            .map_err(|e| CacheStoreError::Operation(e.to_string()))
    }

    fn delete_matching(&self, pattern: &str) -> Result<u64, CacheStoreError> {
        let mut con = self.connection()?;
        let keys: Vec<String> = con
            .keys(pattern)
            .map_err(|e| CacheStoreError::Operation(e.to_string()))?;
        if keys.is_empty() {
            return Ok(0);
        }
        debug!(pattern, count = keys.len(), "deleting matching cache keys");
        let deleted: u64 = con
            .del(&keys)
            .map_err(|e| CacheStoreError::Operation(e.to_string()))?;
        Ok(deleted)
    }
}
