//! End-to-end scenarios over the caching service: the full stack of graph
//! store, resolver, cacheable queries and the in-memory cache store.

use std::collections::BTreeSet;
use std::sync::Arc;

use authgraph_core::GraphError;
use authgraph_core::permissions::{GroupInheritance, UserGroupPermissions};
use authgraph_core::vertex::VertexType;
use authgraph_graph::{GroupsGraph, InProcessAllocator, ROOT_INDEX};
use authgraph_service::{CachingGroupsService, InMemoryCacheStore};

fn service() -> CachingGroupsService<InMemoryCacheStore> {
    let graph = Arc::new(GroupsGraph::new(Arc::new(InProcessAllocator::new())).unwrap());
    CachingGroupsService::new(graph, InMemoryCacheStore::new())
}

#[test]
fn app_creates_a_group_in_its_own_namespace() {
    let svc = service();
    svc.create_user(VertexType::AppUser, "App1", "AppOne").unwrap();

    let group = svc
        .create_group(
            VertexType::AppUser,
            "App1",
            "ezbAudits",
            "root/app/AppOne",
            GroupInheritance::default(),
            UserGroupPermissions::owner(),
            false,
            false,
        )
        .unwrap();
    assert_eq!(group.group_name(), Some("root/app/AppOne/ezbAudits"));
}

#[test]
fn delegated_authorization_unions_app_scoped_groups() {
    let svc = service();
    svc.create_user(VertexType::AppUser, "APP", "APP").unwrap();
    let jared = svc.create_user(VertexType::User, "Jared", "Jared").unwrap();

    let own_group = |name: &str| {
        svc.create_group(
            VertexType::User,
            "Jared",
            name,
            "",
            GroupInheritance::none(),
            UserGroupPermissions::owner(),
            true,
            false,
        )
        .unwrap()
        .index
    };
    let g1 = own_group("g1");
    let g2 = own_group("g2");
    let g3 = own_group("g3");
    let g4 = svc
        .create_group(
            VertexType::AppUser,
            "APP",
            "g4",
            "",
            GroupInheritance::none(),
            UserGroupPermissions::owner(),
            true,
            true,
        )
        .unwrap()
        .index;

    let chain = vec!["APP".to_string()];
    let delegated = svc
        .get_authorizations(VertexType::User, "Jared", &chain)
        .unwrap();
    let expected: BTreeSet<u64> = [ROOT_INDEX, jared.index, g1, g2, g3, g4]
        .into_iter()
        .collect();
    assert_eq!(delegated, expected);

    // Without delegation the app-scoped group is absent, and an empty chain
    // behaves identically to omitting it.
    let own = svc
        .get_authorizations(VertexType::User, "Jared", &[])
        .unwrap();
    assert_eq!(
        own,
        [ROOT_INDEX, jared.index, g1, g2, g3].into_iter().collect()
    );
}

#[test]
fn app_deactivation_narrows_the_delegated_set() {
    let svc = service();
    svc.create_user(VertexType::AppUser, "APP", "APP").unwrap();
    let jared = svc.create_user(VertexType::User, "Jared", "Jared").unwrap();
    let g1 = svc
        .create_group(
            VertexType::User,
            "Jared",
            "g1",
            "",
            GroupInheritance::none(),
            UserGroupPermissions::owner(),
            true,
            false,
        )
        .unwrap()
        .index;
    let g4 = svc
        .create_group(
            VertexType::AppUser,
            "APP",
            "g4",
            "",
            GroupInheritance::none(),
            UserGroupPermissions::owner(),
            true,
            true,
        )
        .unwrap()
        .index;

    let chain = vec!["APP".to_string()];
    let before = svc
        .get_authorizations(VertexType::User, "Jared", &chain)
        .unwrap();
    assert!(before.contains(&g4));

    svc.set_active(VertexType::AppUser, "APP", false).unwrap();
    let after = svc
        .get_authorizations(VertexType::User, "Jared", &chain)
        .unwrap();
    assert_eq!(after, [ROOT_INDEX, jared.index, g1].into_iter().collect());
}

#[test]
fn deactivation_revokes_every_authorization() {
    let svc = service();
    svc.create_user(VertexType::User, "u", "User").unwrap();
    svc.create_group(
        VertexType::User,
        "u",
        "g1",
        "",
        GroupInheritance::none(),
        UserGroupPermissions::owner(),
        true,
        false,
    )
    .unwrap();
    svc.create_group(
        VertexType::User,
        "u",
        "g2",
        "",
        GroupInheritance::none(),
        UserGroupPermissions::owner(),
        true,
        false,
    )
    .unwrap();

    let active = svc.get_authorizations(VertexType::User, "u", &[]).unwrap();
    assert!(active.len() >= 4);
    assert!(active.contains(&ROOT_INDEX));

    svc.set_active(VertexType::User, "u", false).unwrap();
    assert!(
        svc.get_authorizations(VertexType::User, "u", &[])
            .unwrap()
            .is_empty()
    );

    // Deactivation is reversible.
    svc.set_active(VertexType::User, "u", true).unwrap();
    assert_eq!(
        svc.get_authorizations(VertexType::User, "u", &[]).unwrap(),
        active
    );
}

#[test]
fn membership_implies_ancestors_but_not_siblings() {
    let svc = service();
    svc.create_user(VertexType::User, "owner", "Owner").unwrap();
    svc.create_user(VertexType::User, "member", "Member").unwrap();

    let parent = svc
        .create_group(
            VertexType::User,
            "owner",
            "parent",
            "",
            GroupInheritance::none(),
            UserGroupPermissions::owner(),
            true,
            false,
        )
        .unwrap();
    let child = svc
        .create_group(
            VertexType::User,
            "owner",
            "child",
            "root/parent",
            GroupInheritance::none(),
            UserGroupPermissions::owner(),
            true,
            false,
        )
        .unwrap();
    let sibling = svc
        .create_group(
            VertexType::User,
            "owner",
            "sibling",
            "",
            GroupInheritance::none(),
            UserGroupPermissions::owner(),
            true,
            false,
        )
        .unwrap();

    svc.add_user_to_group(
        VertexType::User,
        "member",
        "root/parent/child",
        UserGroupPermissions::member(),
    )
    .unwrap();

    let auths = svc
        .get_authorizations(VertexType::User, "member", &[])
        .unwrap();
    assert!(auths.contains(&child.index));
    assert!(auths.contains(&parent.index));
    assert!(!auths.contains(&sibling.index));
}

#[test]
fn concurrent_group_creation_under_one_parent_admits_exactly_one() {
    let graph = Arc::new(GroupsGraph::new(Arc::new(InProcessAllocator::new())).unwrap());
    graph.add_user(VertexType::User, "alice", "Alice").unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let graph = Arc::clone(&graph);
        handles.push(std::thread::spawn(move || {
            graph.add_group(
                VertexType::User,
                "alice",
                "contested",
                "root",
                GroupInheritance::none(),
                UserGroupPermissions::owner(),
                true,
                false,
            )
        }));
    }

    let mut created = 0;
    let mut exists = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => created += 1,
            Err(GraphError::AlreadyExists(_)) => exists += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(exists, 3);
}

#[test]
fn resolution_stays_consistent_under_concurrent_mutation() {
    let svc = Arc::new(service());
    svc.create_user(VertexType::User, "reader", "Reader").unwrap();
    svc.create_user(VertexType::User, "writer", "Writer").unwrap();
    let reader_index = svc.graph().user(VertexType::User, "reader").unwrap().index;

    let writer = {
        let svc = Arc::clone(&svc);
        std::thread::spawn(move || {
            for i in 0..32 {
                svc.create_group(
                    VertexType::User,
                    "writer",
                    &format!("g{i}"),
                    "",
                    GroupInheritance::none(),
                    UserGroupPermissions::owner(),
                    true,
                    false,
                )
                .unwrap();
            }
        })
    };

    for _ in 0..64 {
        let auths = svc
            .get_authorizations(VertexType::User, "reader", &[])
            .unwrap();
        assert!(auths.contains(&ROOT_INDEX));
        assert!(auths.contains(&reader_index));
    }
    writer.join().unwrap();
}
