//! Error taxonomy shared by the graph store, resolver and service layers.

use thiserror::Error;

use crate::query::InvalidCacheKeyError;

/// Result type used across the graph and service layers.
pub type GraphResult<T> = Result<T, GraphError>;

/// Domain-level failure of a graph or authorization operation.
///
/// Structural/validation errors (everything except `AllocatorUnavailable`)
/// represent caller or data errors and are never retried internally.
/// `AllocatorUnavailable` is transient infrastructure failure: the create
/// operation that needed a new index fails atomically and the caller may
/// retry the whole call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A group or other vertex could not be found.
    #[error("vertex not found: {0}")]
    NotFound(String),

    /// The principal (USER or APP_USER) could not be found.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A vertex with the same unique key already exists.
    #[error("vertex already exists: {0}")]
    AlreadyExists(String),

    /// The acting principal lacks the required permission edge.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Wrong vertex type for an operation (e.g. APP_USER where only users
    /// may join).
    #[error("invalid vertex type: {0}")]
    InvalidType(String),

    /// Empty name, or a name containing the group path separator.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A serialized cache key could not be rehydrated.
    #[error("invalid cache key: {0}")]
    InvalidCacheKey(String),

    /// The identifier allocator's backing counter is unreachable or its
    /// lock could not be acquired within the bounded wait.
    #[error("id allocator unavailable: {0}")]
    AllocatorUnavailable(String),

    /// The mutation would make a group its own direct or transitive
    /// ancestor.
    #[error("circular group reference: {0}")]
    CircularReference(String),
}

impl GraphError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn user_not_found(msg: impl Into<String>) -> Self {
        Self::UserNotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn invalid_type(msg: impl Into<String>) -> Self {
        Self::InvalidType(msg.into())
    }

    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Stable, client-facing error code.
    ///
    /// Clients distinguish "you don't have access" from "that doesn't
    /// exist" from "try again" by this code, not by message text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::InvalidType(_) => "INVALID_TYPE",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::InvalidCacheKey(_) => "INVALID_CACHE_KEY",
            Self::AllocatorUnavailable(_) => "ALLOCATOR_UNAVAILABLE",
            Self::CircularReference(_) => "CIRCULAR_REFERENCE",
        }
    }
}

impl From<InvalidCacheKeyError> for GraphError {
    fn from(err: InvalidCacheKeyError) -> Self {
        Self::InvalidCacheKey(err.to_string())
    }
}
