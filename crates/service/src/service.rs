//! The caching service facade: the administrative and resolution surface
//! exposed to the surrounding RPC layer.
//!
//! Every mutation that can change a principal's resolved authorization set
//! invalidates the matching cached variants through wildcard keys. Chained
//! (delegated) results are cached under the *subject's* key, so a mutation
//! affecting an application's contribution cannot be addressed by any one
//! principal's wildcard; those mutations flush the cache instead.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::info;

use authgraph_core::error::GraphResult;
use authgraph_core::name;
use authgraph_core::permissions::{GroupInheritance, UserGroupPermissions};
use authgraph_core::query::{Queryable, WILDCARD};
use authgraph_core::vertex::{Vertex, VertexType};
use authgraph_graph::GroupsGraph;

use crate::cache::{CacheLayer, CacheStore};
use crate::query::AuthorizationQuery;

pub struct CachingGroupsService<S> {
    graph: Arc<GroupsGraph>,
    cache: CacheLayer<S>,
}

impl<S: CacheStore> CachingGroupsService<S> {
    pub fn new(graph: Arc<GroupsGraph>, store: S) -> Self {
        Self {
            graph,
            cache: CacheLayer::new(store),
        }
    }

    pub fn graph(&self) -> &Arc<GroupsGraph> {
        &self.graph
    }

    pub fn cache(&self) -> &CacheLayer<S> {
        &self.cache
    }

    fn auth_query(
        &self,
        vertex_type: VertexType,
        principal: &str,
        chain: Option<Vec<String>>,
    ) -> AuthorizationQuery {
        AuthorizationQuery::new(Arc::clone(&self.graph), vertex_type, principal, chain)
    }

    /// Invalidate every cached variant for the given principal.
    fn invalidate_principal(&self, vertex_type: VertexType, principal: &str) {
        let wildcard = self.auth_query(vertex_type, principal, None).wildcard_key();
        self.cache.invalidate(&wildcard);
        // An application's groups feed into other principals' chained
        // entries, which no per-principal wildcard can address.
        if vertex_type == VertexType::AppUser {
            self.cache.invalidate(WILDCARD);
        }
    }

    fn invalidate_members(&self, members: &[Vertex]) {
        for member in members {
            if let Some(principal) = member.as_principal() {
                self.invalidate_principal(member.vertex_type, &principal.principal);
            }
        }
    }

    /// Invalidate every principal whose resolved set can involve the given
    /// group or anything below it.
    fn invalidate_group_subtree(&self, group_path: &str) -> GraphResult<()> {
        let mut paths = vec![group_path.to_string()];
        for child in self.graph.group_children(group_path, true)? {
            if let Some(path) = child.group_name() {
                paths.push(path.to_string());
            }
        }
        for path in paths {
            let members = self.graph.group_members(&path, false)?;
            self.invalidate_members(&members);
        }
        Ok(())
    }

    pub fn create_user(
        &self,
        vertex_type: VertexType,
        principal: &str,
        display_name: &str,
    ) -> GraphResult<Vertex> {
        let vertex = self.graph.add_user(vertex_type, principal, display_name)?;
        self.invalidate_principal(vertex_type, principal);
        Ok(vertex)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_group(
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
        let parent = name::add_root_prefix(parent_path);
        let vertex = self.graph.add_group(
            creator_type,
            creator_id,
            friendly_name,
            &parent,
            inheritance,
            permissions,
            require_only_user,
            require_only_app,
        )?;
        info!(group = ?vertex.group_name(), index = vertex.index, "created group");
        self.invalidate_principal(creator_type, creator_id);
        Ok(vertex)
    }

    pub fn add_user_to_group(
        &self,
        vertex_type: VertexType,
        principal: &str,
        group_path: &str,
        permissions: UserGroupPermissions,
    ) -> GraphResult<()> {
        let group = name::add_root_prefix(group_path);
        self.graph
            .add_user_to_group(vertex_type, principal, &group, permissions)?;
        self.invalidate_principal(vertex_type, principal);
        Ok(())
    }

    pub fn remove_user_from_group(
        &self,
        vertex_type: VertexType,
        principal: &str,
        group_path: &str,
    ) -> GraphResult<()> {
        let group = name::add_root_prefix(group_path);
        self.graph
            .remove_user_from_group(vertex_type, principal, &group)?;
        self.invalidate_principal(vertex_type, principal);
        Ok(())
    }

    /// Activate or deactivate a principal. Deactivation revokes every
    /// derived authorization until the principal is reactivated.
    pub fn set_active(
        &self,
        vertex_type: VertexType,
        principal: &str,
        active: bool,
    ) -> GraphResult<()> {
        self.graph.set_user_active(vertex_type, principal, active)?;
        self.invalidate_principal(vertex_type, principal);
        Ok(())
    }

    /// Activate or deactivate a group, optionally with its whole subtree.
    pub fn set_group_active(
        &self,
        actor_type: VertexType,
        actor_id: &str,
        group_path: &str,
        active: bool,
        and_children: bool,
    ) -> GraphResult<()> {
        let group = name::add_root_prefix(group_path);
        self.graph
            .set_group_active(actor_type, actor_id, &group, active, and_children)?;
        self.invalidate_group_subtree(&group)
    }

    pub fn set_group_inheritance(
        &self,
        group_path: &str,
        inheritance: GroupInheritance,
    ) -> GraphResult<()> {
        let group = name::add_root_prefix(group_path);
        self.graph.set_group_inheritance(&group, inheritance)?;
        // Reach changes for everyone who could reach the parent.
        match name::parent_path(&group) {
            Some(parent) => self.invalidate_group_subtree(parent),
            None => Ok(()),
        }
    }

    /// Rename a group's leaf segment. Indices are untouched, so cached
    /// authorization sets stay valid.
    pub fn change_group_name(
        &self,
        actor_type: VertexType,
        actor_id: &str,
        group_path: &str,
        new_friendly_name: &str,
    ) -> GraphResult<HashMap<String, String>> {
        let group = name::add_root_prefix(group_path);
        self.graph
            .change_group_name(actor_type, actor_id, &group, new_friendly_name)
    }

    /// Resolve a principal's authorization set, through the cache. An empty
    /// chain behaves identically to omitting delegation.
    pub fn get_authorizations(
        &self,
        vertex_type: VertexType,
        principal: &str,
        chain: &[String],
    ) -> GraphResult<BTreeSet<u64>> {
        let chain = (!chain.is_empty()).then(|| chain.to_vec());
        let query = self.auth_query(vertex_type, principal, chain);
        self.cache.fetch(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use authgraph_graph::InProcessAllocator;

    fn service() -> CachingGroupsService<InMemoryCacheStore> {
        let graph =
            Arc::new(GroupsGraph::new(Arc::new(InProcessAllocator::new())).unwrap());
        CachingGroupsService::new(graph, InMemoryCacheStore::new())
    }

    #[test]
    fn membership_changes_are_visible_through_the_cache() {
        let svc = service();
        svc.create_user(VertexType::User, "alice", "Alice").unwrap();
        svc.create_user(VertexType::User, "bob", "Bob").unwrap();
        let group = svc
            .create_group(
                VertexType::User,
                "alice",
                "team",
                "",
                GroupInheritance::none(),
                UserGroupPermissions::owner(),
                true,
                false,
            )
            .unwrap();

        // Prime the cache with Bob's pre-membership set.
        let before = svc
            .get_authorizations(VertexType::User, "bob", &[])
            .unwrap();
        assert!(!before.contains(&group.index));

        svc.add_user_to_group(
            VertexType::User,
            "bob",
            "team",
            UserGroupPermissions::member(),
        )
        .unwrap();
        let after = svc.get_authorizations(VertexType::User, "bob", &[]).unwrap();
        assert!(after.contains(&group.index));
    }

    #[test]
    fn deactivating_a_user_empties_a_cached_set() {
        let svc = service();
        svc.create_user(VertexType::User, "alice", "Alice").unwrap();
        assert!(
            !svc.get_authorizations(VertexType::User, "alice", &[])
                .unwrap()
                .is_empty()
        );

        svc.set_active(VertexType::User, "alice", false).unwrap();
        assert!(
            svc.get_authorizations(VertexType::User, "alice", &[])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn app_deactivation_invalidates_chained_entries_of_other_principals() {
        let svc = service();
        svc.create_user(VertexType::AppUser, "APP", "APP").unwrap();
        svc.create_user(VertexType::User, "jared", "Jared").unwrap();
        let g4 = svc
            .create_group(
                VertexType::AppUser,
                "APP",
                "group4",
                "",
                GroupInheritance::none(),
                UserGroupPermissions::owner(),
                false,
                true,
            )
            .unwrap();

        let chain = vec!["APP".to_string()];
        let delegated = svc
            .get_authorizations(VertexType::User, "jared", &chain)
            .unwrap();
        assert!(delegated.contains(&g4.index));

        // The cached USER:jared:APP entry must not outlive the app.
        svc.set_active(VertexType::AppUser, "APP", false).unwrap();
        let delegated = svc
            .get_authorizations(VertexType::User, "jared", &chain)
            .unwrap();
        assert!(!delegated.contains(&g4.index));
    }

    #[test]
    fn group_deactivation_invalidates_subtree_members() {
        let svc = service();
        svc.create_user(VertexType::User, "alice", "Alice").unwrap();
        svc.create_user(VertexType::User, "bob", "Bob").unwrap();
        let team = svc
            .create_group(
                VertexType::User,
                "alice",
                "team",
                "",
                GroupInheritance::none(),
                UserGroupPermissions::owner(),
                true,
                false,
            )
            .unwrap();
        svc.add_user_to_group(
            VertexType::User,
            "bob",
            "team",
            UserGroupPermissions::member(),
        )
        .unwrap();

        let before = svc.get_authorizations(VertexType::User, "bob", &[]).unwrap();
        assert!(before.contains(&team.index));

        svc.set_group_active(VertexType::User, "alice", "team", false, true)
            .unwrap();
        let after = svc.get_authorizations(VertexType::User, "bob", &[]).unwrap();
        assert!(!after.contains(&team.index));
    }

    #[test]
    fn unavailable_cache_never_breaks_resolution() {
        let svc = service();
        svc.create_user(VertexType::User, "alice", "Alice").unwrap();
        svc.cache().store().set_unavailable(true);

        let auths = svc
            .get_authorizations(VertexType::User, "alice", &[])
            .unwrap();
        assert!(!auths.is_empty());
        // Mutations keep working while invalidation is degraded.
        svc.set_active(VertexType::User, "alice", false).unwrap();
        assert!(
            svc.get_authorizations(VertexType::User, "alice", &[])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn paths_are_root_normalized() {
        let svc = service();
        svc.create_user(VertexType::User, "alice", "Alice").unwrap();
        let group = svc
            .create_group(
                VertexType::User,
                "alice",
                "team",
                "root",
                GroupInheritance::none(),
                UserGroupPermissions::owner(),
                true,
                false,
            )
            .unwrap();
        assert_eq!(group.group_name(), Some("root/team"));

        // Unprefixed paths address the same group.
        svc.add_user_to_group(
            VertexType::User,
            "alice",
            "team",
            UserGroupPermissions::member(),
        )
        .unwrap();
        let renamed = svc
            .change_group_name(VertexType::User, "alice", "team", "crew")
            .unwrap();
        assert_eq!(
            renamed.get("root/team").map(String::as_str),
            Some("root/crew")
        );
    }
}
