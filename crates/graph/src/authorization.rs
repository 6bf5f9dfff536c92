//! Recursive authorization resolution.
//!
//! A principal's authorization set is the union of: the root group's index
//! (every active principal holds it), the principal's own index, the index
//! of every active group reachable along data-access edges, and the index of
//! every active ancestor of those groups up the inheritance relation,
//! stopping at, but including, a terminator vertex. A delegation chain adds,
//! for each active application it names, the indices of that application's
//! app-scoped (`require_only_app`) groups.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use authgraph_core::error::{GraphError, GraphResult};
use authgraph_core::vertex::{Vertex, VertexType};

use crate::store::{GraphState, ROOT_INDEX};
use crate::traverse;

pub(crate) fn resolve(
    state: &GraphState,
    vertex_type: VertexType,
    principal: &str,
    chain: &[String],
) -> GraphResult<BTreeSet<u64>> {
    let mut auths = BTreeSet::new();

    // Only principals resolve; anything else is an empty result, not an
    // error.
    if !vertex_type.is_principal() {
        debug!(%vertex_type, "non-principal authorization request, returning empty set");
        return Ok(auths);
    }

    let user = state
        .principal_index(vertex_type, principal)
        .and_then(|i| state.vertex(i))
        .ok_or_else(|| {
            GraphError::user_not_found(format!("no user found: {vertex_type}:{principal}"))
        })?;

    // Deactivation revokes everything derived, including root.
    if !user.active {
        debug!(principal, "user is inactive, returning empty set");
        return Ok(auths);
    }

    auths.insert(ROOT_INDEX);
    auths.insert(user.index);

    for group in traverse::reachable_groups(state, user.index, false) {
        auths.insert(group);
        let terminator = state.vertex(group).is_some_and(|v| v.terminator);
        if terminator {
            continue;
        }
        auths.extend(traverse::active_ancestors(state, group));
    }

    for app in chain {
        auths.extend(delegated_indices(state, app));
    }

    debug!(principal, count = auths.len(), "resolved authorization set");
    Ok(auths)
}

/// The group indices an application in the delegation chain always
/// contributes: its own reachable active groups flagged `require_only_app`.
/// A missing or inactive application contributes nothing.
fn delegated_indices(state: &GraphState, app: &str) -> BTreeSet<u64> {
    let Some(vertex) = state
        .principal_index(VertexType::AppUser, app)
        .and_then(|i| state.vertex(i))
    else {
        warn!(app, "chained application not found, skipping");
        return BTreeSet::new();
    };
    if !vertex.active {
        debug!(app, "chained application is inactive, skipping");
        return BTreeSet::new();
    }

    traverse::reachable_groups(state, vertex.index, false)
        .into_iter()
        .filter(|&group| {
            state
                .vertex(group)
                .and_then(Vertex::as_group)
                .is_some_and(|g| g.require_only_app)
        })
        .collect()
}
