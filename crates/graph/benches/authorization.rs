use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use authgraph_core::permissions::{GroupInheritance, UserGroupPermissions};
use authgraph_core::vertex::VertexType;
use authgraph_graph::{GroupsGraph, InProcessAllocator};

/// A graph with one user who is a direct member of the leaf of a group
/// chain of the given depth, so resolution walks the whole ancestry.
fn deep_membership_graph(depth: usize) -> GroupsGraph {
    let graph = GroupsGraph::new(Arc::new(InProcessAllocator::new())).unwrap();
    graph.add_user(VertexType::User, "owner", "Owner").unwrap();
    graph.add_user(VertexType::User, "member", "Member").unwrap();

    let mut parent = "root".to_string();
    for level in 0..depth {
        let child = graph
            .add_group(
                VertexType::User,
                "owner",
                &format!("level{level}"),
                &parent,
                GroupInheritance::none(),
                UserGroupPermissions::owner(),
                true,
                false,
            )
            .unwrap();
        parent = child.group_name().unwrap().to_string();
    }

    graph
        .add_user_to_group(
            VertexType::User,
            "member",
            &parent,
            UserGroupPermissions::member(),
        )
        .unwrap();
    graph
}

fn bench_authorization_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("authorization_resolution");
    for depth in [4usize, 16, 64] {
        let graph = deep_membership_graph(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let auths = graph
                    .authorizations(VertexType::User, black_box("member"), &[])
                    .unwrap();
                assert!(auths.len() >= depth);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_authorization_resolution);
criterion_main!(benches);
