//! Permission flag bundles carried on membership and inheritance relations.

use serde::{Deserialize, Serialize};

/// Permissions a principal holds on a group.
///
/// `data_access` is the membership flag proper; the four `admin_*` flags
/// gate administrative operations on the group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserGroupPermissions {
    pub data_access: bool,
    pub admin_read: bool,
    pub admin_write: bool,
    pub admin_manage: bool,
    pub admin_create_child: bool,
}

impl UserGroupPermissions {
    pub fn new(
        data_access: bool,
        admin_read: bool,
        admin_write: bool,
        admin_manage: bool,
        admin_create_child: bool,
    ) -> Self {
        Self {
            data_access,
            admin_read,
            admin_write,
            admin_manage,
            admin_create_child,
        }
    }

    /// All five flags: the permissions a group's creator receives.
    pub fn owner() -> Self {
        Self::new(true, true, true, true, true)
    }

    /// Plain membership: data access only.
    pub fn member() -> Self {
        Self::new(true, false, false, false, false)
    }
}

/// Which permission flags propagate automatically from a parent group to a
/// newly created child group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupInheritance {
    pub data_access: bool,
    pub admin_read: bool,
    pub admin_write: bool,
    pub admin_manage: bool,
    pub admin_create_child: bool,
}

impl GroupInheritance {
    pub fn new(
        data_access: bool,
        admin_read: bool,
        admin_write: bool,
        admin_manage: bool,
        admin_create_child: bool,
    ) -> Self {
        Self {
            data_access,
            admin_read,
            admin_write,
            admin_manage,
            admin_create_child,
        }
    }

    /// Nothing propagates from the parent.
    pub fn none() -> Self {
        Self::default()
    }

    /// Membership propagates, administration does not.
    pub fn data_access_only() -> Self {
        Self::new(true, false, false, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_has_every_flag() {
        let p = UserGroupPermissions::owner();
        assert!(
            p.data_access && p.admin_read && p.admin_write && p.admin_manage && p.admin_create_child
        );
    }

    #[test]
    fn member_has_data_access_only() {
        let p = UserGroupPermissions::member();
        assert!(p.data_access);
        assert!(!p.admin_read && !p.admin_write && !p.admin_manage && !p.admin_create_child);
    }

    #[test]
    fn default_inheritance_propagates_nothing() {
        assert_eq!(GroupInheritance::default(), GroupInheritance::none());
    }
}
