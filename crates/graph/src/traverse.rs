//! Breadth-first traversal helpers over the graph state.

use std::collections::{BTreeSet, VecDeque};

use crate::store::{EdgeLabel, GraphState};

/// Whether a path of edges with any of the given labels runs from `source`
/// to `target`.
pub(crate) fn path_exists(
    state: &GraphState,
    source: u64,
    target: u64,
    labels: &[EdgeLabel],
) -> bool {
    if source == target {
        return true;
    }
    let mut visited = BTreeSet::from([source]);
    let mut queue = VecDeque::from([source]);
    while let Some(current) = queue.pop_front() {
        for label in labels {
            for next in state.outgoing(current, *label) {
                if next == target {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    false
}

/// Groups reachable from a principal along data-access edges: the
/// principal's membership closure. Traversal neither includes nor descends
/// past an inactive group unless `include_inactive` is set.
pub(crate) fn reachable_groups(
    state: &GraphState,
    principal: u64,
    include_inactive: bool,
) -> Vec<u64> {
    let mut groups = Vec::new();
    let mut visited = BTreeSet::from([principal]);
    let mut queue = VecDeque::from([principal]);
    while let Some(current) = queue.pop_front() {
        for next in state.outgoing(current, EdgeLabel::DataAccess) {
            if !visited.insert(next) {
                continue;
            }
            let Some(vertex) = state.vertex(next) else {
                continue;
            };
            if vertex.as_group().is_none() {
                continue;
            }
            if !vertex.active && !include_inactive {
                continue;
            }
            groups.push(next);
            queue.push_back(next);
        }
    }
    groups
}

/// Active ancestors of a group along the inheritance relation, nearest
/// first. An inactive ancestor ends the walk without being included; a
/// terminator ancestor is included but never traversed past.
pub(crate) fn active_ancestors(state: &GraphState, group: u64) -> Vec<u64> {
    let mut ancestors = Vec::new();
    let mut current = group;
    while let Some(parent) = state.parent_of(current) {
        let Some(vertex) = state.vertex(parent) else {
            break;
        };
        if !vertex.active {
            break;
        }
        ancestors.push(parent);
        if vertex.terminator {
            break;
        }
        current = parent;
    }
    ancestors
}

/// Every group below the given one along the inheritance relation.
pub(crate) fn descendants(state: &GraphState, group: u64) -> Vec<u64> {
    let mut result = Vec::new();
    let mut visited = BTreeSet::from([group]);
    let mut queue = VecDeque::from([group]);
    while let Some(current) = queue.pop_front() {
        for next in state.outgoing(current, EdgeLabel::ChildGroup) {
            if visited.insert(next) {
                result.push(next);
                queue.push_back(next);
            }
        }
    }
    result
}

/// Principals that can reach a group along data-access edges, walked
/// backwards from the group. With `explicit_only`, only principals holding
/// a direct grant.
pub(crate) fn member_principals(state: &GraphState, group: u64, explicit_only: bool) -> Vec<u64> {
    let mut members = Vec::new();
    let mut visited = BTreeSet::from([group]);
    let mut queue = VecDeque::from([group]);
    while let Some(current) = queue.pop_front() {
        for source in state.incoming(current, EdgeLabel::DataAccess) {
            if !visited.insert(source) {
                continue;
            }
            let Some(vertex) = state.vertex(source) else {
                continue;
            };
            if vertex.vertex_type.is_principal() {
                members.push(source);
            } else if vertex.as_group().is_some() && !explicit_only {
                queue.push_back(source);
            }
        }
        if explicit_only {
            break;
        }
    }
    members
}
