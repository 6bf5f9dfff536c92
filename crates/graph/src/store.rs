//! The graph store: principal and group vertices, labeled permission edges,
//! and the structural invariants enforced on every mutation.
//!
//! Vertices live in an index-addressed table and edges are adjacency sets of
//! indices, so cycle detection is a plain reachability check. Permission
//! grants materialize as labeled edges: `DataAccess` is membership proper,
//! the `Admin*` labels gate administrative operations, and `ChildGroup` is
//! the inheritance relation. Reads run concurrently; mutations serialize
//! through the single write lock, which subsumes the per-vertex
//! serialization the store must provide.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use authgraph_core::error::{GraphError, GraphResult};
use authgraph_core::name;
use authgraph_core::permissions::{GroupInheritance, UserGroupPermissions};
use authgraph_core::vertex::{GroupData, Vertex, VertexType};

use crate::allocator::IdAllocator;
use crate::authorization;
use crate::traverse;

/// Index of the root group. Assigned at construction, outside the allocator;
/// the allocator's sequence starts above it.
pub const ROOT_INDEX: u64 = 0;

/// Label on a directed edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeLabel {
    /// Inheritance relation, parent group to child group.
    ChildGroup,
    /// Membership / data access grant.
    DataAccess,
    AdminRead,
    AdminWrite,
    AdminManage,
    AdminCreateChild,
}

impl EdgeLabel {
    /// The five permission labels, in flag-bundle order.
    pub const PERMISSIONS: [EdgeLabel; 5] = [
        EdgeLabel::DataAccess,
        EdgeLabel::AdminRead,
        EdgeLabel::AdminWrite,
        EdgeLabel::AdminManage,
        EdgeLabel::AdminCreateChild,
    ];
}

fn permission_flags(permissions: UserGroupPermissions) -> [(EdgeLabel, bool); 5] {
    [
        (EdgeLabel::DataAccess, permissions.data_access),
        (EdgeLabel::AdminRead, permissions.admin_read),
        (EdgeLabel::AdminWrite, permissions.admin_write),
        (EdgeLabel::AdminManage, permissions.admin_manage),
        (EdgeLabel::AdminCreateChild, permissions.admin_create_child),
    ]
}

fn inheritance_flags(inheritance: GroupInheritance) -> [(EdgeLabel, bool); 5] {
    [
        (EdgeLabel::DataAccess, inheritance.data_access),
        (EdgeLabel::AdminRead, inheritance.admin_read),
        (EdgeLabel::AdminWrite, inheritance.admin_write),
        (EdgeLabel::AdminManage, inheritance.admin_manage),
        (EdgeLabel::AdminCreateChild, inheritance.admin_create_child),
    ]
}

/// Vertex and edge tables. All access goes through the owning
/// [`GroupsGraph`]'s lock.
#[derive(Debug, Default)]
pub(crate) struct GraphState {
    vertices: HashMap<u64, Vertex>,
    principals: HashMap<(VertexType, String), u64>,
    groups: HashMap<String, u64>,
    out_edges: HashMap<(u64, EdgeLabel), BTreeSet<u64>>,
    in_edges: HashMap<(u64, EdgeLabel), BTreeSet<u64>>,
}

impl GraphState {
    pub(crate) fn vertex(&self, index: u64) -> Option<&Vertex> {
        self.vertices.get(&index)
    }

    pub(crate) fn group_index(&self, path: &str) -> Option<u64> {
        self.groups.get(path).copied()
    }

    pub(crate) fn principal_index(&self, vertex_type: VertexType, principal: &str) -> Option<u64> {
        self.principals
            .get(&(vertex_type, principal.to_string()))
            .copied()
    }

    pub(crate) fn outgoing(
        &self,
        index: u64,
        label: EdgeLabel,
    ) -> impl Iterator<Item = u64> + '_ {
        self.out_edges
            .get(&(index, label))
            .into_iter()
            .flatten()
            .copied()
    }

    pub(crate) fn incoming(
        &self,
        index: u64,
        label: EdgeLabel,
    ) -> impl Iterator<Item = u64> + '_ {
        self.in_edges
            .get(&(index, label))
            .into_iter()
            .flatten()
            .copied()
    }

    /// The logical parent of a group along the inheritance relation.
    pub(crate) fn parent_of(&self, index: u64) -> Option<u64> {
        self.incoming(index, EdgeLabel::ChildGroup).next()
    }

    fn add_edge(&mut self, source: u64, label: EdgeLabel, target: u64) {
        self.out_edges.entry((source, label)).or_default().insert(target);
        self.in_edges.entry((target, label)).or_default().insert(source);
    }

    fn remove_edge(&mut self, source: u64, label: EdgeLabel, target: u64) {
        if let Some(targets) = self.out_edges.get_mut(&(source, label)) {
            targets.remove(&target);
        }
        if let Some(sources) = self.in_edges.get_mut(&(target, label)) {
            sources.remove(&source);
        }
    }

    /// Create or clear the five permission edges between two vertices. A set
    /// flag adds the edge (idempotently); a cleared flag removes it, which is
    /// what makes repeated grants act as updates.
    fn set_permission_edges(&mut self, source: u64, target: u64, flags: [(EdgeLabel, bool); 5]) {
        for (label, grant) in flags {
            if grant {
                self.add_edge(source, label, target);
            } else {
                self.remove_edge(source, label, target);
            }
        }
    }

    fn insert_group(&mut self, index: u64, data: GroupData) {
        self.groups.insert(data.group_name.clone(), index);
        self.vertices.insert(index, Vertex::group(index, data));
    }

    fn insert_principal(&mut self, vertex: Vertex) {
        let principal = vertex
            .as_principal()
            .expect("principal vertex must carry principal payload")
            .principal
            .clone();
        self.principals
            .insert((vertex.vertex_type, principal), vertex.index);
        self.vertices.insert(vertex.index, vertex);
    }

    /// Pre-flight validation for a new child group; returns its full path.
    fn validate_new_group(&self, parent_index: u64, friendly_name: &str) -> GraphResult<String> {
        if friendly_name.is_empty() || friendly_name.contains(name::SEPARATOR) {
            return Err(GraphError::invalid_name(format!(
                "group name must be non-empty and must not contain '{}'",
                name::SEPARATOR
            )));
        }

        let parent = self
            .vertex(parent_index)
            .and_then(Vertex::as_group)
            .ok_or_else(|| GraphError::not_found(format!("parent group #{parent_index}")))?;

        let path = format!(
            "{}{}{}",
            parent.group_name,
            name::SEPARATOR,
            friendly_name
        );
        if self.groups.contains_key(&path) {
            return Err(GraphError::already_exists(format!(
                "'{}' already has a child named '{}'",
                parent.group_name, friendly_name
            )));
        }
        Ok(path)
    }

    /// Wire `child` under `parent`: the inheritance edge plus whichever
    /// permission edges the inheritance policy propagates. Rejects any edge
    /// that would make a group its own direct or transitive ancestor.
    fn link_child_group(
        &mut self,
        parent: u64,
        child: u64,
        inheritance: GroupInheritance,
    ) -> GraphResult<()> {
        if parent == child
            || traverse::path_exists(self, child, parent, &[EdgeLabel::ChildGroup])
        {
            return Err(GraphError::CircularReference(format!(
                "linking #{child} under #{parent} would create a cycle"
            )));
        }
        self.add_edge(parent, EdgeLabel::ChildGroup, child);
        self.set_permission_edges(parent, child, inheritance_flags(inheritance));
        Ok(())
    }
}

/// The group-and-authorization graph.
///
/// Holds principal and group vertices and their edges, provisions the root
/// group and the `app`/`appaccess` namespaces at construction, and exposes
/// the primitive operations the authorization resolver and the
/// administrative API need.
pub struct GroupsGraph {
    state: RwLock<GraphState>,
    allocator: Arc<dyn IdAllocator>,
    app_group_index: u64,
    app_access_group_index: u64,
}

impl GroupsGraph {
    /// Build an empty graph: the root group at index 0 plus the `root/app`
    /// and `root/appaccess` namespace groups, whose indices come from the
    /// allocator.
    pub fn new(allocator: Arc<dyn IdAllocator>) -> GraphResult<Self> {
        let mut state = GraphState::default();
        state.insert_group(ROOT_INDEX, GroupData::new(name::ROOT, name::ROOT));

        let app_group_index = Self::allocate(&allocator)?;
        Self::provision_group(
            &mut state,
            app_group_index,
            ROOT_INDEX,
            name::APP_NAMESPACE,
            GroupInheritance::none(),
        )?;
        let app_access_group_index = Self::allocate(&allocator)?;
        Self::provision_group(
            &mut state,
            app_access_group_index,
            ROOT_INDEX,
            name::APP_ACCESS_NAMESPACE,
            GroupInheritance::none(),
        )?;
        info!(
            app_group_index,
            app_access_group_index, "provisioned root namespace groups"
        );

        Ok(Self {
            state: RwLock::new(state),
            allocator,
            app_group_index,
            app_access_group_index,
        })
    }

    fn allocate(allocator: &Arc<dyn IdAllocator>) -> GraphResult<u64> {
        allocator
            .next()
            .map_err(|e| GraphError::AllocatorUnavailable(e.to_string()))
    }

    /// Validate and insert a group under a pre-allocated index, with no
    /// access checks.
    fn provision_group(
        state: &mut GraphState,
        index: u64,
        parent_index: u64,
        friendly_name: &str,
        inheritance: GroupInheritance,
    ) -> GraphResult<()> {
        let path = state.validate_new_group(parent_index, friendly_name)?;
        state.insert_group(index, GroupData::new(path, friendly_name));
        state.link_child_group(parent_index, index, inheritance)
    }

    pub fn app_group_index(&self) -> u64 {
        self.app_group_index
    }

    pub fn app_access_group_index(&self) -> u64 {
        self.app_access_group_index
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().expect("graph state poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().expect("graph state poisoned")
    }

    /// Add a principal vertex. The new principal is wired to the root group
    /// with data access and create-child. The first APP_USER with a given
    /// name additionally gets its `root/app/<name>` and
    /// `root/appaccess/<name>` groups provisioned, owned by the app.
    pub fn add_user(
        &self,
        vertex_type: VertexType,
        principal: &str,
        display_name: &str,
    ) -> GraphResult<Vertex> {
        info!(%vertex_type, principal, display_name, "processing add_user");
        if !vertex_type.is_principal() {
            return Err(GraphError::invalid_type(format!(
                "cannot create a user of type {vertex_type}"
            )));
        }

        let mut state = self.write();
        if state.principal_index(vertex_type, principal).is_some() {
            warn!(%vertex_type, principal, "user already exists, not creating");
            return Err(GraphError::already_exists(format!(
                "a {vertex_type} with principal '{principal}' already exists"
            )));
        }

        if vertex_type == VertexType::AppUser {
            if display_name.trim().is_empty() {
                return Err(GraphError::invalid_name(
                    "app users must have a name in order to create app groups",
                ));
            }
            if display_name.contains(name::SEPARATOR) {
                return Err(GraphError::invalid_name(format!(
                    "app user name must not contain '{}'",
                    name::SEPARATOR
                )));
            }
            if state.group_index(&name::app_group_name(display_name)).is_some() {
                return Err(GraphError::already_exists(format!(
                    "application groups for '{display_name}' already exist"
                )));
            }
        }

        // Allocate every index this create needs before touching the state,
        // so allocator unavailability cannot leave a partial vertex behind.
        let index = Self::allocate(&self.allocator)?;
        let app_indices = if vertex_type == VertexType::AppUser {
            Some((
                Self::allocate(&self.allocator)?,
                Self::allocate(&self.allocator)?,
            ))
        } else {
            None
        };

        let vertex = Vertex::principal(index, vertex_type, principal, display_name);
        state.insert_principal(vertex.clone());

        // Every principal belongs to root and may create groups under it.
        state.set_permission_edges(
            index,
            ROOT_INDEX,
            permission_flags(UserGroupPermissions::new(true, false, false, false, true)),
        );

        if let Some((app_group, access_group)) = app_indices {
            // Apps get direct data access on the appaccess namespace, an app
            // group of their own, and an app access group that propagates
            // membership to principals granted access to the app.
            state.add_edge(index, EdgeLabel::DataAccess, self.app_access_group_index);

            Self::provision_group(
                &mut state,
                app_group,
                self.app_group_index,
                display_name,
                GroupInheritance::none(),
            )?;
            state.set_permission_edges(
                index,
                app_group,
                permission_flags(UserGroupPermissions::owner()),
            );

            Self::provision_group(
                &mut state,
                access_group,
                self.app_access_group_index,
                display_name,
                GroupInheritance::data_access_only(),
            )?;
            state.set_permission_edges(
                index,
                access_group,
                permission_flags(UserGroupPermissions::owner()),
            );
        }

        Ok(vertex)
    }

    /// Add a group under an existing parent path.
    ///
    /// The creator must exist and hold create-child on the parent. The
    /// child's full path is the parent path plus the friendly name; a
    /// sibling with the same friendly name is rejected. The inheritance
    /// policy decides which permission edges run from the parent to the new
    /// group, and the creator receives the given permissions directly.
    #[allow(clippy::too_many_arguments)]
    pub fn add_group(
        &self,
        creator_type: VertexType,
        creator_id: &str,
        friendly_name: &str,
        parent_path: &str,
        inheritance: GroupInheritance,
        permissions: UserGroupPermissions,
        require_only_user: bool,
        require_only_app: bool,
    ) -> GraphResult<Vertex> {
        info!(friendly_name, parent_path, "processing add_group");
        if !creator_type.is_principal() {
            return Err(GraphError::invalid_type(format!(
                "group creator must be a principal, got {creator_type}"
            )));
        }

        let mut state = self.write();
        let parent_index = state
            .group_index(parent_path)
            .ok_or_else(|| GraphError::not_found(format!("parent group '{parent_path}'")))?;

        // The app access namespace is flat: its per-app groups gate access to
        // an application and never grow subtrees.
        if parent_index == self.app_access_group_index
            || traverse::path_exists(
                &state,
                self.app_access_group_index,
                parent_index,
                &[EdgeLabel::ChildGroup],
            )
        {
            return Err(GraphError::access_denied(format!(
                "no child groups may be added under the '{}' namespace",
                name::APP_ACCESS_NAMESPACE
            )));
        }

        let creator_index = state
            .principal_index(creator_type, creator_id)
            .ok_or_else(|| {
                GraphError::user_not_found("requested owner for new group does not exist")
            })?;

        if !traverse::path_exists(
            &state,
            creator_index,
            parent_index,
            &[EdgeLabel::AdminCreateChild],
        ) {
            return Err(GraphError::access_denied(format!(
                "'{creator_id}' may not create child groups under '{parent_path}'"
            )));
        }

        let path = state.validate_new_group(parent_index, friendly_name)?;
        let index = Self::allocate(&self.allocator)?;

        let mut data = GroupData::new(path, friendly_name);
        data.require_only_user = require_only_user;
        data.require_only_app = require_only_app;
        state.insert_group(index, data);
        state.link_child_group(parent_index, index, inheritance)?;
        state.set_permission_edges(creator_index, index, permission_flags(permissions));

        Ok(state
            .vertex(index)
            .cloned()
            .expect("freshly inserted group vertex"))
    }

    /// Wire an existing group under another existing group.
    ///
    /// Exposed for administrative re-linking; rejects any edge that would
    /// make a group its own direct or transitive ancestor.
    pub fn add_child_edge(
        &self,
        parent_path: &str,
        child_path: &str,
        inheritance: GroupInheritance,
    ) -> GraphResult<()> {
        let mut state = self.write();
        let parent = state
            .group_index(parent_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{parent_path}'")))?;
        let child = state
            .group_index(child_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{child_path}'")))?;
        state.link_child_group(parent, child, inheritance)
    }

    /// Create or update a principal's permission edges on a group.
    pub fn add_user_to_group(
        &self,
        vertex_type: VertexType,
        principal: &str,
        group_path: &str,
        permissions: UserGroupPermissions,
    ) -> GraphResult<()> {
        info!(%vertex_type, principal, group_path, "processing add_user_to_group");
        if !vertex_type.is_principal() {
            return Err(GraphError::invalid_type(format!(
                "cannot add a vertex of type {vertex_type} to groups"
            )));
        }

        let mut state = self.write();
        let user_index = state
            .principal_index(vertex_type, principal)
            .ok_or_else(|| GraphError::user_not_found(format!("no user with id '{principal}'")))?;
        let group_index = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;

        let group = state
            .vertex(group_index)
            .and_then(Vertex::as_group)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;
        if !group.admits(vertex_type) {
            return Err(GraphError::invalid_type(format!(
                "group '{group_path}' does not admit {vertex_type} members"
            )));
        }

        state.set_permission_edges(user_index, group_index, permission_flags(permissions));
        Ok(())
    }

    /// Drop a principal's direct membership grant on a group. Administrative
    /// edges are untouched.
    pub fn remove_user_from_group(
        &self,
        vertex_type: VertexType,
        principal: &str,
        group_path: &str,
    ) -> GraphResult<()> {
        info!(%vertex_type, principal, group_path, "processing remove_user_from_group");
        let mut state = self.write();
        let user_index = state
            .principal_index(vertex_type, principal)
            .ok_or_else(|| GraphError::user_not_found(format!("no user with id '{principal}'")))?;
        let group_index = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;
        state.remove_edge(user_index, EdgeLabel::DataAccess, group_index);
        Ok(())
    }

    /// Flip a principal's active flag. Edges are untouched, so reactivation
    /// restores the previous memberships.
    pub fn set_user_active(
        &self,
        vertex_type: VertexType,
        principal: &str,
        active: bool,
    ) -> GraphResult<()> {
        info!(%vertex_type, principal, active, "processing set_user_active");
        if !vertex_type.is_principal() {
            return Err(GraphError::invalid_type(format!(
                "cannot change activation of type {vertex_type}"
            )));
        }

        let mut state = self.write();
        let index = state
            .principal_index(vertex_type, principal)
            .ok_or_else(|| GraphError::user_not_found(format!("no user with id '{principal}'")))?;
        if let Some(vertex) = state.vertices.get_mut(&index) {
            vertex.active = active;
        }
        Ok(())
    }

    /// Flip a group's active flag, optionally together with its whole
    /// subtree. The actor must hold admin-manage on the group.
    pub fn set_group_active(
        &self,
        actor_type: VertexType,
        actor_id: &str,
        group_path: &str,
        active: bool,
        and_children: bool,
    ) -> GraphResult<()> {
        info!(group_path, active, and_children, "processing set_group_active");
        let mut state = self.write();
        let actor = state
            .principal_index(actor_type, actor_id)
            .ok_or_else(|| GraphError::user_not_found(format!("no user with id '{actor_id}'")))?;
        let group = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;

        if !traverse::path_exists(&state, actor, group, &[EdgeLabel::AdminManage]) {
            return Err(GraphError::access_denied(
                "admin manage permissions are required to activate or deactivate a group",
            ));
        }

        let mut targets = vec![group];
        if and_children {
            targets.extend(traverse::descendants(&state, group));
        }
        for index in targets {
            if let Some(vertex) = state.vertices.get_mut(&index) {
                vertex.active = active;
            }
        }
        Ok(())
    }

    /// Replace the permission edges a group inherits from its parent.
    pub fn set_group_inheritance(
        &self,
        group_path: &str,
        inheritance: GroupInheritance,
    ) -> GraphResult<()> {
        let mut state = self.write();
        let group = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;
        let parent = state
            .parent_of(group)
            .ok_or_else(|| GraphError::not_found(format!("parent of group '{group_path}'")))?;
        state.set_permission_edges(parent, group, inheritance_flags(inheritance));
        Ok(())
    }

    /// Mark or unmark a group as an upward-traversal terminator.
    pub fn set_group_terminator(&self, group_path: &str, terminator: bool) -> GraphResult<()> {
        let mut state = self.write();
        let index = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;
        if let Some(vertex) = state.vertices.get_mut(&index) {
            vertex.terminator = terminator;
        }
        Ok(())
    }

    /// Change a group's friendly name, rewriting its own fully qualified
    /// path and every descendant's. The actor must hold admin-manage on the
    /// group and on every descendant. Returns the old-path → new-path map,
    /// empty when the name is already current.
    pub fn change_group_name(
        &self,
        actor_type: VertexType,
        actor_id: &str,
        group_path: &str,
        new_friendly_name: &str,
    ) -> GraphResult<HashMap<String, String>> {
        if new_friendly_name.is_empty() || new_friendly_name.contains(name::SEPARATOR) {
            return Err(GraphError::invalid_name(format!(
                "group name must be non-empty and must not contain '{}'",
                name::SEPARATOR
            )));
        }

        let mut state = self.write();
        let group = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;
        if name::leaf(group_path) == new_friendly_name {
            return Ok(HashMap::new());
        }

        let actor = state
            .principal_index(actor_type, actor_id)
            .ok_or_else(|| GraphError::user_not_found(format!("no user with id '{actor_id}'")))?;
        let descendants = traverse::descendants(&state, group);
        for target in std::iter::once(group).chain(descendants.iter().copied()) {
            if !traverse::path_exists(&state, actor, target, &[EdgeLabel::AdminManage]) {
                return Err(GraphError::access_denied(
                    "admin manage permissions are required on a group and all of its children to rename it",
                ));
            }
        }

        let new_path = name::change_leaf(group_path, new_friendly_name);
        if state.groups.contains_key(&new_path) {
            return Err(GraphError::already_exists(format!(
                "cannot rename '{group_path}': '{new_path}' already exists"
            )));
        }

        info!(group_path, %new_path, "renaming group");
        let mut renamed = HashMap::new();
        for index in std::iter::once(group).chain(descendants) {
            let (old, updated) = {
                let vertex = state
                    .vertices
                    .get_mut(&index)
                    .expect("descendant vertex must exist");
                if index == group {
                    vertex.name = new_friendly_name.to_string();
                }
                let data = vertex.as_group_mut().expect("descendants are groups");
                let old = data.group_name.clone();
                let updated = format!("{new_path}{}", &old[group_path.len()..]);
                data.group_name = updated.clone();
                if index == group {
                    data.friendly_name = new_friendly_name.to_string();
                }
                (old, updated)
            };
            state.groups.remove(&old);
            state.groups.insert(updated.clone(), index);
            renamed.insert(old, updated);
        }
        Ok(renamed)
    }

    /// Look up a principal vertex.
    pub fn user(&self, vertex_type: VertexType, principal: &str) -> GraphResult<Vertex> {
        if !vertex_type.is_principal() {
            return Err(GraphError::invalid_type(format!(
                "'{vertex_type}' is not a user type that can be retrieved"
            )));
        }
        let state = self.read();
        state
            .principal_index(vertex_type, principal)
            .and_then(|i| state.vertex(i).cloned())
            .ok_or_else(|| {
                GraphError::user_not_found(format!(
                    "user '{principal}' of type '{vertex_type}' not found"
                ))
            })
    }

    /// Look up a group vertex by fully qualified path.
    pub fn group(&self, group_path: &str) -> GraphResult<Vertex> {
        let state = self.read();
        state
            .group_index(group_path)
            .and_then(|i| state.vertex(i).cloned())
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))
    }

    /// The groups a principal is a member of: groups reachable along data
    /// access edges, or only directly granted ones when `explicit_only`.
    pub fn user_groups(
        &self,
        vertex_type: VertexType,
        principal: &str,
        explicit_only: bool,
        include_inactive: bool,
    ) -> GraphResult<Vec<Vertex>> {
        let state = self.read();
        let user = state
            .principal_index(vertex_type, principal)
            .ok_or_else(|| GraphError::user_not_found(format!("no user with id '{principal}'")))?;

        let indices = if explicit_only {
            state
                .outgoing(user, EdgeLabel::DataAccess)
                .filter(|&i| {
                    state.vertex(i).is_some_and(|v| {
                        v.as_group().is_some() && (include_inactive || v.active)
                    })
                })
                .collect()
        } else {
            traverse::reachable_groups(&state, user, include_inactive)
        };
        Ok(indices
            .into_iter()
            .filter_map(|i| state.vertex(i).cloned())
            .collect())
    }

    /// Principals that can reach a group along data access edges, or only
    /// directly granted members when `explicit_only`.
    pub fn group_members(&self, group_path: &str, explicit_only: bool) -> GraphResult<Vec<Vertex>> {
        let state = self.read();
        let group = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;
        Ok(traverse::member_principals(&state, group, explicit_only)
            .into_iter()
            .filter_map(|i| state.vertex(i).cloned())
            .collect())
    }

    /// Child groups of a group, optionally the whole subtree.
    pub fn group_children(&self, group_path: &str, recurse: bool) -> GraphResult<Vec<Vertex>> {
        let state = self.read();
        let group = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;
        let indices = if recurse {
            traverse::descendants(&state, group)
        } else {
            state.outgoing(group, EdgeLabel::ChildGroup).collect()
        };
        Ok(indices
            .into_iter()
            .filter_map(|i| state.vertex(i).cloned())
            .collect())
    }

    /// The permission flags a principal holds on a group, direct or
    /// inherited along any permission-edge path.
    pub fn user_permissions_on_group(
        &self,
        vertex_type: VertexType,
        principal: &str,
        group_path: &str,
    ) -> GraphResult<UserGroupPermissions> {
        let state = self.read();
        let user = state
            .principal_index(vertex_type, principal)
            .ok_or_else(|| GraphError::user_not_found(format!("no user with id '{principal}'")))?;
        let group = state
            .group_index(group_path)
            .ok_or_else(|| GraphError::not_found(format!("group '{group_path}'")))?;

        let has = |label| traverse::path_exists(&state, user, group, &[label]);
        Ok(UserGroupPermissions::new(
            has(EdgeLabel::DataAccess),
            has(EdgeLabel::AdminRead),
            has(EdgeLabel::AdminWrite),
            has(EdgeLabel::AdminManage),
            has(EdgeLabel::AdminCreateChild),
        ))
    }

    /// Resolve the full authorization set for a principal, optionally
    /// through a delegation chain of application names.
    pub fn authorizations(
        &self,
        vertex_type: VertexType,
        principal: &str,
        chain: &[String],
    ) -> GraphResult<BTreeSet<u64>> {
        let state = self.read();
        authorization::resolve(&state, vertex_type, principal, chain)
    }
}
