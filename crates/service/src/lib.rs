//! `authgraph-service` — the caching service facade over the graph.
//!
//! Authorization reads go through a read-through cache layer keyed by the
//! cacheable-query contract; graph mutations invalidate every cached variant
//! for the affected principals through their wildcard keys. The cache is an
//! optimization, never a source of truth: any cache failure degrades to a
//! fresh graph traversal.

pub mod cache;
pub mod query;
pub mod service;

pub use cache::{CacheLayer, CacheStore, CacheStoreError, InMemoryCacheStore};
pub use query::AuthorizationQuery;
pub use service::CachingGroupsService;
