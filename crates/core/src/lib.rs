//! `authgraph-core` — domain foundation for the group-and-authorization graph.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the vertex data model, permission flag bundles, the group-name normalizer,
//! the error taxonomy, and the cacheable-query contract.

pub mod error;
pub mod name;
pub mod permissions;
pub mod query;
pub mod vertex;

pub use error::{GraphError, GraphResult};
pub use permissions::{GroupInheritance, UserGroupPermissions};
pub use query::{CacheDecodeError, InvalidCacheKeyError, Queryable};
pub use vertex::{GroupData, PrincipalData, Vertex, VertexPayload, VertexType};
