//! Vertex data model: the tagged-union record stored at every graph node.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Role of a vertex in the graph.
///
/// Type is part of identity: the same principal string may exist once as
/// `User` and once as `AppUser` without collision.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexType {
    Group,
    AppGroup,
    GroupMapping,
    User,
    AppUser,
}

impl VertexType {
    /// Whether this type can be the subject of an authorization query.
    pub fn is_principal(self) -> bool {
        matches!(self, Self::User | Self::AppUser)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "GROUP",
            Self::AppGroup => "APP_GROUP",
            Self::GroupMapping => "GROUP_MAPPING",
            Self::User => "USER",
            Self::AppUser => "APP_USER",
        }
    }
}

impl fmt::Display for VertexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VertexType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GROUP" => Ok(Self::Group),
            "APP_GROUP" => Ok(Self::AppGroup),
            "GROUP_MAPPING" => Ok(Self::GroupMapping),
            "USER" => Ok(Self::User),
            "APP_USER" => Ok(Self::AppUser),
            other => Err(GraphError::invalid_type(format!(
                "unknown vertex type '{other}'"
            ))),
        }
    }
}

/// Group-specific vertex payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupData {
    /// Fully qualified, root-prefixed path. Unique among groups.
    pub group_name: String,
    /// Leaf display name (last path segment).
    pub friendly_name: String,
    /// Users may be joined to this group.
    pub require_only_user: bool,
    /// App users may be joined to this group; also marks groups a delegating
    /// application always contributes to a chained authorization query.
    pub require_only_app: bool,
}

impl GroupData {
    pub fn new(group_name: impl Into<String>, friendly_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            friendly_name: friendly_name.into(),
            require_only_user: true,
            require_only_app: false,
        }
    }

    /// Whether a principal of `vertex_type` may be joined to this group.
    ///
    /// `(true, false)` admits users only, `(false, true)` apps only; any
    /// other combination leaves membership unconstrained.
    pub fn admits(&self, vertex_type: VertexType) -> bool {
        match vertex_type {
            VertexType::User => self.require_only_user || !self.require_only_app,
            VertexType::AppUser => self.require_only_app || !self.require_only_user,
            _ => false,
        }
    }
}

/// Principal-specific vertex payload. Shared shape for USER and APP_USER.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalData {
    /// Opaque external identity string, unique per vertex type.
    pub principal: String,
}

/// Type-specific payload of a vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexPayload {
    Group(GroupData),
    Principal(PrincipalData),
}

/// A node of the authorization graph.
///
/// `index` is assigned exactly once at creation by the identifier allocator
/// and is never reused or reassigned. Vertices are never physically deleted
/// in the steady state; deactivation (`active = false`) is the sole removal
/// operation and is reversible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub index: u64,
    /// Human-readable name (display name for principals, leaf name for
    /// groups).
    pub name: String,
    pub vertex_type: VertexType,
    pub active: bool,
    /// Upward inheritance traversal must not continue past this vertex.
    pub terminator: bool,
    pub created_at: DateTime<Utc>,
    pub payload: VertexPayload,
}

impl Vertex {
    pub fn group(index: u64, data: GroupData) -> Self {
        Self {
            index,
            name: data.friendly_name.clone(),
            vertex_type: VertexType::Group,
            active: true,
            terminator: false,
            created_at: Utc::now(),
            payload: VertexPayload::Group(data),
        }
    }

    pub fn principal(
        index: u64,
        vertex_type: VertexType,
        principal: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            vertex_type,
            active: true,
            terminator: false,
            created_at: Utc::now(),
            payload: VertexPayload::Principal(PrincipalData {
                principal: principal.into(),
            }),
        }
    }

    pub fn as_group(&self) -> Option<&GroupData> {
        match &self.payload {
            VertexPayload::Group(data) => Some(data),
            VertexPayload::Principal(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupData> {
        match &mut self.payload {
            VertexPayload::Group(data) => Some(data),
            VertexPayload::Principal(_) => None,
        }
    }

    pub fn as_principal(&self) -> Option<&PrincipalData> {
        match &self.payload {
            VertexPayload::Group(_) => None,
            VertexPayload::Principal(data) => Some(data),
        }
    }

    /// Fully qualified path, for group vertices.
    pub fn group_name(&self) -> Option<&str> {
        self.as_group().map(|g| g.group_name.as_str())
    }
}
