use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::access::{catalog, Actor};

/// Account role. Determines the default capability set; see
/// `access::defaults`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Standard,
    Admin,
    Display,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub role: Role,
    /// JSON array of capability tokens, exactly as stored. Parsed and
    /// validated once, in [`Account::actor`].
    #[serde(skip_serializing)]
    pub permissions: String,
    pub is_super_admin: bool,
    pub sensitive_unmasked: bool,
    pub linked_person_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Resolve the stored row into an [`Actor`]: parse the permission blob,
    /// drop anything not in the catalog. The single place raw tokens become
    /// typed capabilities.
    pub fn actor(&self) -> Actor {
        let raw: Vec<String> = serde_json::from_str(&self.permissions).unwrap_or_else(|e| {
            tracing::warn!(
                account_id = self.id,
                "stored permission blob is not a JSON string array: {}",
                e
            );
            Vec::new()
        });
        Actor {
            account_id: self.id,
            username: self.username.clone(),
            role: self.role,
            permissions: catalog::normalize_tokens(&raw),
            is_super_admin: self.is_super_admin,
            sensitive_unmasked: self.sensitive_unmasked,
            linked_person_id: self.linked_person_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Capability;

    fn account(permissions: &str) -> Account {
        Account {
            id: 1,
            username: "zhangsan".into(),
            password_digest: String::new(),
            role: Role::Standard,
            permissions: permissions.into(),
            is_super_admin: false,
            sensitive_unmasked: false,
            linked_person_id: Some(7),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn actor_normalizes_stored_blob() {
        let a = account(r#"["people.view.self", "bogus.token", "people.edit.self"]"#);
        let actor = a.actor();
        assert_eq!(actor.permissions.len(), 2);
        assert!(actor.permissions.contains(&Capability::PeopleViewSelf));
        assert_eq!(actor.linked_person_id, Some(7));
    }

    #[test]
    fn malformed_blob_yields_empty_set() {
        let a = account("not json");
        assert!(a.actor().permissions.is_empty());
    }
}
