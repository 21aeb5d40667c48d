use std::collections::HashSet;

use crate::access::catalog::Capability;
use crate::database::models::Role;

/// Default capability set for a role.
///
/// Invoked on account provisioning and again on every administrative role
/// change, where it overwrites whatever custom grants the account held.
/// Super-admins bypass token checks entirely; their set is materialized as
/// the full catalog so display surfaces have something to show.
pub fn default_permissions(role: Role, is_super_admin: bool) -> HashSet<Capability> {
    if is_super_admin {
        return Capability::ALL.iter().copied().collect();
    }

    match role {
        Role::Standard => HashSet::from([
            Capability::PeopleViewSelf,
            Capability::PeopleEditSelf,
            Capability::DimensionsEditSelf,
            Capability::GrowthViewSelf,
            Capability::GrowthEditSelf,
            Capability::CertificatesUpload,
            Capability::CertificatesDelete,
        ]),
        // Display accounts drive wall screens: read-only, never sensitive.
        Role::Display => HashSet::from([
            Capability::PeopleViewAll,
            Capability::GrowthViewAll,
        ]),
        Role::Admin => Capability::ALL.iter().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_gets_self_tokens_only() {
        let set = default_permissions(Role::Standard, false);
        assert!(!set.iter().any(|c| c.as_str().ends_with(".all")));
        assert!(set.contains(&Capability::PeopleViewSelf));
        assert!(set.contains(&Capability::PeopleEditSelf));
        assert!(!set.contains(&Capability::SensitiveView));
    }

    #[test]
    fn display_never_sees_sensitive() {
        let set = default_permissions(Role::Display, false);
        assert!(set.contains(&Capability::PeopleViewAll));
        assert!(!set.contains(&Capability::SensitiveView));
        assert!(!set.iter().any(|c| c.as_str().contains(".edit.")));
    }

    #[test]
    fn admin_gets_broad_set() {
        let set = default_permissions(Role::Admin, false);
        assert!(set.contains(&Capability::PeopleEditAll));
        assert!(set.contains(&Capability::ImportRun));
        assert!(set.contains(&Capability::AccountsManage));
    }

    #[test]
    fn super_admin_set_is_full_catalog() {
        let set = default_permissions(Role::Standard, true);
        assert_eq!(set.len(), Capability::ALL.len());
    }
}
