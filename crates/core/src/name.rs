//! Group name normalization: pure string utilities, no state.
//!
//! Fully qualified group names are root-prefixed paths joined with `/`, e.g.
//! `root/app/AppOne/audits`. The `app` and `appaccess` namespaces directly
//! under root hold application-scoped groups.

/// Reserved root token; the root group's full path.
pub const ROOT: &str = "root";

/// Path separator between group name segments.
pub const SEPARATOR: char = '/';

/// Namespace under root holding each application's own group subtree.
pub const APP_NAMESPACE: &str = "app";

/// Namespace under root gating which principals may interact with an
/// application at all.
pub const APP_ACCESS_NAMESPACE: &str = "appaccess";

/// Canonicalize a group name into root-prefixed path form.
///
/// Names already rooted (the root token itself, or anything under it) are
/// returned unchanged; the empty string canonicalizes to the root path.
pub fn add_root_prefix(name: &str) -> String {
    if name.is_empty() {
        return ROOT.to_string();
    }
    if is_rooted(name) {
        return name.to_string();
    }
    format!("{ROOT}{SEPARATOR}{name}")
}

/// Strip the root prefix, if present.
pub fn remove_root_prefix(name: &str) -> &str {
    if name == ROOT {
        return "";
    }
    name.strip_prefix(&format!("{ROOT}{SEPARATOR}"))
        .unwrap_or(name)
}

fn is_rooted(name: &str) -> bool {
    name == ROOT
        || (name.starts_with(ROOT) && name[ROOT.len()..].starts_with(SEPARATOR))
}

/// Fully qualified name of an application's own group: `root/app/<app>`.
pub fn app_group_name(app: &str) -> String {
    format!("{ROOT}{SEPARATOR}{APP_NAMESPACE}{SEPARATOR}{app}")
}

/// Fully qualified name of an application's access group:
/// `root/appaccess/<app>`.
pub fn app_access_group_name(app: &str) -> String {
    format!("{ROOT}{SEPARATOR}{APP_ACCESS_NAMESPACE}{SEPARATOR}{app}")
}

/// Replace the leaf segment of a fully qualified name.
///
/// `change_leaf("root/parent/old", "new")` is `root/parent/new`. A name with
/// no separator is replaced entirely.
pub fn change_leaf(fully_qualified: &str, new_leaf: &str) -> String {
    match fully_qualified.rsplit_once(SEPARATOR) {
        Some((parent, _)) => format!("{parent}{SEPARATOR}{new_leaf}"),
        None => new_leaf.to_string(),
    }
}

/// Parent path of a fully qualified name, or `None` at the root.
pub fn parent_path(fully_qualified: &str) -> Option<&str> {
    fully_qualified.rsplit_once(SEPARATOR).map(|(parent, _)| parent)
}

/// Leaf segment of a fully qualified name.
pub fn leaf(fully_qualified: &str) -> &str {
    fully_qualified
        .rsplit_once(SEPARATOR)
        .map(|(_, leaf)| leaf)
        .unwrap_or(fully_qualified)
}
