use crate::access::catalog::Capability;
use crate::access::Actor;

/// `true` when the actor may perform the action named by `cap`.
/// Super-admins pass every check regardless of their stored token set.
pub fn has_capability(actor: &Actor, cap: Capability) -> bool {
    actor.is_super_admin || actor.permissions.contains(&cap)
}

/// Boolean OR of `has_capability` over the given tokens.
pub fn has_any_capability(actor: &Actor, caps: &[Capability]) -> bool {
    actor.is_super_admin || caps.iter().any(|c| actor.permissions.contains(c))
}

/// An all-or-self token pair for one resource type.
///
/// Every person-scoped gate in the system is an instance of this rule:
/// the "all" token grants access to any person, the "self" token only when
/// the actor's linked person is the target.
#[derive(Debug, Clone, Copy)]
pub struct ScopedRule {
    pub all: Capability,
    pub self_token: Capability,
}

pub const VIEW_PERSON: ScopedRule = ScopedRule {
    all: Capability::PeopleViewAll,
    self_token: Capability::PeopleViewSelf,
};

pub const EDIT_PERSON: ScopedRule = ScopedRule {
    all: Capability::PeopleEditAll,
    self_token: Capability::PeopleEditSelf,
};

pub const EDIT_DIMENSIONS: ScopedRule = ScopedRule {
    all: Capability::DimensionsEditAll,
    self_token: Capability::DimensionsEditSelf,
};

pub const VIEW_GROWTH: ScopedRule = ScopedRule {
    all: Capability::GrowthViewAll,
    self_token: Capability::GrowthViewSelf,
};

pub const EDIT_GROWTH: ScopedRule = ScopedRule {
    all: Capability::GrowthEditAll,
    self_token: Capability::GrowthEditSelf,
};

/// Evaluate a scoped rule against a target person.
pub fn allows(actor: &Actor, rule: ScopedRule, person_id: i64) -> bool {
    if has_capability(actor, rule.all) {
        return true;
    }
    has_capability(actor, rule.self_token) && actor.linked_person_id == Some(person_id)
}

pub fn can_view_person(actor: &Actor, person_id: i64) -> bool {
    allows(actor, VIEW_PERSON, person_id)
}

pub fn can_edit_person(actor: &Actor, person_id: i64) -> bool {
    allows(actor, EDIT_PERSON, person_id)
}

pub fn can_edit_dimensions(actor: &Actor, person_id: i64) -> bool {
    allows(actor, EDIT_DIMENSIONS, person_id)
}

pub fn can_view_growth(actor: &Actor, person_id: i64) -> bool {
    allows(actor, VIEW_GROWTH, person_id)
}

pub fn can_edit_growth(actor: &Actor, person_id: i64) -> bool {
    allows(actor, EDIT_GROWTH, person_id)
}

/// Certificate management needs an action token (upload or delete) plus
/// either the broad edit grant or an identity match on the target person.
pub fn can_manage_certificates(actor: &Actor, person_id: i64) -> bool {
    if actor.is_super_admin {
        return true;
    }
    let holds_action = has_any_capability(
        actor,
        &[Capability::CertificatesUpload, Capability::CertificatesDelete],
    );
    if !holds_action {
        return false;
    }
    has_capability(actor, Capability::PeopleEditAll) || actor.linked_person_id == Some(person_id)
}
