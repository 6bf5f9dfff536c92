//! Read-through cache layer over a [`CacheStore`].
//!
//! The cache is an optimization, never a source of truth: a read failure, a
//! malformed entry or a failed population all degrade to recomputing from
//! the graph, and none of them are surfaced to the caller.

use tracing::{debug, warn};

use authgraph_core::error::GraphResult;
use authgraph_core::query::Queryable;

use super::CacheStore;

pub struct CacheLayer<S> {
    store: S,
}

impl<S: CacheStore> CacheLayer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The value for `query`, from the cache when possible.
    ///
    /// On a miss the query runs against the graph and the result is written
    /// back best-effort; a failed write still returns the freshly computed
    /// value.
    pub fn fetch<Q: Queryable>(&self, query: &Q) -> GraphResult<Q::Value> {
        let key = query.key();

        match self.store.get(&key) {
            Ok(Some(members)) => match query.from_cacheable(&members) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(key, %err, "malformed cache entry, recomputing");
                }
            },
            Ok(None) => debug!(key, "cache miss"),
            Err(err) => warn!(key, %err, "cache read failed, falling back to graph"),
        }

        let value = query.run()?;
        if let Err(err) = self.store.put(&key, &query.to_cacheable(&value)) {
            warn!(key, %err, "cache population failed, returning fresh result");
        }
        Ok(value)
    }

    /// Drop every cached variant matching the wildcard pattern.
    /// Best-effort: an unreachable cache only costs later recomputation.
    pub fn invalidate(&self, wildcard_key: &str) {
        match self.store.delete_matching(wildcard_key) {
            Ok(deleted) => debug!(wildcard_key, deleted, "invalidated cache entries"),
            Err(err) => warn!(wildcard_key, %err, "cache invalidation failed"),
        }
    }
}
