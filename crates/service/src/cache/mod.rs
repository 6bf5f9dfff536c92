//! External cache store contract and the read-through cache layer.

mod in_memory;
mod layer;
#[cfg(feature = "redis")]
mod redis;

pub use in_memory::InMemoryCacheStore;
pub use layer::CacheLayer;
#[cfg(feature = "redis")]
pub use redis::RedisCacheStore;

use thiserror::Error;

use authgraph_core::query::WILDCARD;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheStoreError {
    /// The cache backend is unreachable.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// A cache command failed.
    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// Key-value store holding flat string collections, with pattern-based
/// multi-key deletion.
pub trait CacheStore: Send + Sync {
    /// The collection stored under `key`, or `None` on a miss.
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheStoreError>;

    /// Replace the collection stored under `key`.
    fn put(&self, key: &str, members: &[String]) -> Result<(), CacheStoreError>;

    /// Delete every key matching the pattern; returns how many were
    /// deleted. Patterns are literal keys, optionally with a trailing
    /// wildcard.
    fn delete_matching(&self, pattern: &str) -> Result<u64, CacheStoreError>;
}

/// Trailing-wildcard pattern match, as used by wildcard invalidation keys.
pub(crate) fn key_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix(WILDCARD) {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_patterns_match_by_prefix() {
        assert!(key_matches("USER:jared*", "USER:jared"));
        assert!(key_matches("USER:jared*", "USER:jared:APP"));
        assert!(!key_matches("USER:jared*", "USER:bob"));
    }

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(key_matches("USER:jared", "USER:jared"));
        assert!(!key_matches("USER:jared", "USER:jared:APP"));
    }
}
