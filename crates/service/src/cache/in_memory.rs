//! In-memory cache store.
//!
//! Intended for tests/dev and single-process deployments. The backend can be
//! flipped to unavailable so degradation paths are testable.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{CacheStore, CacheStoreError, key_matches};

#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, Vec<String>>>,
    unavailable: AtomicBool,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache entries poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), CacheStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheStoreError::Unavailable(
                "backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheStoreError> {
        self.check_available()?;
        Ok(self
            .entries
            .read()
            .expect("cache entries poisoned")
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, members: &[String]) -> Result<(), CacheStoreError> {
        self.check_available()?;
        self.entries
            .write()
            .expect("cache entries poisoned")
            .insert(key.to_string(), members.to_vec());
        Ok(())
    }

    fn delete_matching(&self, pattern: &str) -> Result<u64, CacheStoreError> {
        self.check_available()?;
        let mut entries = self.entries.write().expect("cache entries poisoned");
        let before = entries.len();
        entries.retain(|key, _| !key_matches(pattern, key));
        Ok((before - entries.len()) as u64)
    }
}
