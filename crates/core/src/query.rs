//! Cacheable query contract.
//!
//! Any resolver query that should be representable in an external key-value
//! cache implements [`Queryable`]: a deterministic key, a wildcard pattern
//! that matches every cached variant for the same principal, and a lossless
//! flat-string encoding of the result.

use thiserror::Error;

use crate::error::GraphResult;

/// Fixed token joining key segments.
pub const KEY_SEPARATOR: &str = ":";

/// Trailing marker of a wildcard key.
pub const WILDCARD: &str = "*";

/// A serialized cache key that could not be rehydrated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid cache key '{key}': {reason}")]
pub struct InvalidCacheKeyError {
    pub key: String,
    pub reason: String,
}

impl InvalidCacheKeyError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// A cached collection member that could not be decoded back into a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed cache member '{0}'")]
pub struct CacheDecodeError(pub String);

/// A query whose result can live in an external key-value cache.
///
/// Keys are built by joining, in order, principal type, principal id and,
/// only when a delegation chain is present, the comma-joined chain, using
/// [`KEY_SEPARATOR`]. An absent chain and an empty chain produce the same
/// key.
pub trait Queryable {
    type Value;

    /// Deterministic cache key for this query instance.
    fn key(&self) -> String;

    /// Pattern matching every cached variant (every chain) for this query's
    /// principal, used for one-shot invalidation.
    fn wildcard_key(&self) -> String;

    /// Rehydrate this query from a serialized key; inverse of [`key`].
    ///
    /// Fails when the key has fewer than two segments.
    ///
    /// [`key`]: Queryable::key
    fn update_from_key(&mut self, key: &str) -> Result<(), InvalidCacheKeyError>;

    /// Execute the underlying query against the graph.
    fn run(&self) -> GraphResult<Self::Value>;

    /// The value returned by convention when a query is determined not
    /// runnable. Never a null-equivalent.
    fn invalid_result(&self) -> Self::Value;

    /// Encode a result into the flat string collection stored in the cache.
    fn to_cacheable(&self, value: &Self::Value) -> Vec<String>;

    /// Decode a cached collection; malformed members fail the conversion.
    fn from_cacheable(&self, members: &[String]) -> Result<Self::Value, CacheDecodeError>;
}
