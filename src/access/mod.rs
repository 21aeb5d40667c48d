//! Capability-based access control: the token catalog, per-role defaults and
//! the scoped evaluator. Gating decisions take a fully-resolved [`Actor`];
//! raw permission blobs never reach this layer.

pub mod catalog;
pub mod defaults;
pub mod evaluate;

use std::collections::HashSet;

pub use catalog::Capability;
pub use evaluate::{
    allows, can_edit_dimensions, can_edit_growth, can_edit_person, can_manage_certificates,
    can_view_growth, can_view_person, has_any_capability, has_capability, ScopedRule,
};

use crate::database::models::Role;

/// Authenticated caller, resolved once per request by the auth middleware.
#[derive(Debug, Clone)]
pub struct Actor {
    pub account_id: i64,
    pub username: String,
    pub role: Role,
    /// Normalized against the catalog at load time.
    pub permissions: HashSet<Capability>,
    pub is_super_admin: bool,
    /// Per-account viewing preference; holding `sensitive.view` alone is not
    /// enough to see unmasked data.
    pub sensitive_unmasked: bool,
    /// Set when this account IS a person in the archive.
    pub linked_person_id: Option<i64>,
}

impl Actor {
    /// Permission list for display surfaces: the full catalog for
    /// super-admins, the stored set (in catalog order) otherwise.
    pub fn materialized_permissions(&self) -> Vec<Capability> {
        if self.is_super_admin {
            Capability::ALL.to_vec()
        } else {
            Capability::ALL
                .iter()
                .filter(|c| self.permissions.contains(c))
                .copied()
                .collect()
        }
    }
}
