//! `authgraph-graph` — identifier allocation and the group-authorization
//! graph store.
//!
//! The store holds principal and group vertices with labeled permission
//! edges, enforces the structural invariants (uniqueness, type constraints,
//! non-circularity), and answers authorization queries by traversal.
//! Identifier allocation is pluggable: an in-process atomic counter for
//! single-process deployments and tests, or a counter held by an external
//! coordination service for multi-instance deployments.

pub mod allocator;
mod authorization;
pub mod coordination;
pub mod store;
mod traverse;

pub use allocator::{AllocatorError, CoordinatedAllocator, CurrentIdSource, IdAllocator, InProcessAllocator};
pub use coordination::{CoordinationClient, CoordinationError, InMemoryCoordination, LockLease};
pub use store::{EdgeLabel, GroupsGraph, ROOT_INDEX};
