use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::access::{self, catalog, defaults, Actor, Capability};
use crate::auth;
use crate::database::models::{Account, Role};
use crate::services::{AuditService, ServiceError};

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub is_super_admin: bool,
    pub linked_person_id: Option<i64>,
}

#[derive(Clone)]
pub struct AccountService {
    pool: SqlitePool,
    audit: AuditService,
}

impl AccountService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    pub async fn account_by_id(&self, id: i64) -> Result<Option<Account>, ServiceError> {
        Ok(sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Credential check for login. Deliberately one error shape for unknown
    /// username and wrong password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Account, ServiceError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        match account {
            Some(account) if auth::verify_password(password, &account.password_digest) => {
                Ok(account)
            }
            _ => Err(ServiceError::NotFound("invalid username or password".into())),
        }
    }

    pub async fn create(&self, actor: &Actor, new: NewAccount) -> Result<Account, ServiceError> {
        if !access::has_capability(actor, Capability::AccountsManage) {
            return Err(ServiceError::Forbidden);
        }
        let account = self.provision(new).await?;
        self.audit
            .record(
                Some(actor.account_id),
                "account.create",
                "account",
                Some(account.id),
                &account.username,
            )
            .await;
        Ok(account)
    }

    /// Insert an account with its role's default permission set. Also used by
    /// the CLI bootstrap, which has no acting account to gate on.
    pub async fn provision(&self, new: NewAccount) -> Result<Account, ServiceError> {
        let username = new.username.trim();
        if username.is_empty() || new.password.is_empty() {
            return Err(ServiceError::Validation(vec![
                "username and password must not be blank".into(),
            ]));
        }

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!("account already exists: {}", username)));
        }

        let permissions = permission_blob(defaults::default_permissions(new.role, new.is_super_admin));
        let now = Utc::now();
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts
                (username, password_digest, role, permissions, is_super_admin,
                 sensitive_unmasked, linked_person_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(auth::password_digest(&new.password))
        .bind(new.role)
        .bind(permissions)
        .bind(new.is_super_admin)
        .bind(new.linked_person_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(account_id = account.id, username, "provisioned account");
        Ok(account)
    }

    /// Change an account's role. The stored permission set is recomputed from
    /// the new role's defaults, discarding any custom grants the account had.
    pub async fn change_role(
        &self,
        actor: &Actor,
        account_id: i64,
        new_role: Role,
    ) -> Result<Account, ServiceError> {
        if !access::has_capability(actor, Capability::AccountsManage) {
            return Err(ServiceError::Forbidden);
        }
        let current = self.require_account(account_id).await?;

        let permissions = permission_blob(defaults::default_permissions(new_role, current.is_super_admin));
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET role = ?, permissions = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(new_role)
        .bind(permissions)
        .bind(Utc::now())
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        self.audit
            .record(Some(actor.account_id), "account.change_role", "account", Some(account_id), account.role_str())
            .await;
        Ok(account)
    }

    /// Replace an account's explicit permission set. Every token must be in
    /// the catalog; unknown tokens fail the whole grant, all of them named.
    pub async fn set_permissions(
        &self,
        actor: &Actor,
        account_id: i64,
        tokens: &[String],
    ) -> Result<Account, ServiceError> {
        if !access::has_capability(actor, Capability::AccountsManage) {
            return Err(ServiceError::Forbidden);
        }
        self.require_account(account_id).await?;

        let set = catalog::validate_tokens(tokens).map_err(|unknown| {
            ServiceError::Validation(
                unknown
                    .into_iter()
                    .map(|t| format!("unknown capability token: {}", t))
                    .collect(),
            )
        })?;

        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET permissions = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(permission_blob(set))
        .bind(Utc::now())
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        self.audit
            .record(Some(actor.account_id), "account.set_permissions", "account", Some(account_id), "")
            .await;
        Ok(account)
    }

    /// Per-account unmasked-viewing preference; an actor only toggles their own.
    pub async fn set_sensitive_unmasked(
        &self,
        actor: &Actor,
        unmasked: bool,
    ) -> Result<Account, ServiceError> {
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET sensitive_unmasked = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(unmasked)
        .bind(Utc::now())
        .bind(actor.account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn delete(&self, actor: &Actor, account_id: i64) -> Result<(), ServiceError> {
        if !access::has_capability(actor, Capability::AccountsManage) {
            return Err(ServiceError::Forbidden);
        }
        self.require_account(account_id).await?;

        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        // Audit rows referencing this account stay behind by design of the
        // audit table (no foreign key).
        self.audit
            .record(Some(actor.account_id), "account.delete", "account", Some(account_id), "")
            .await;
        Ok(())
    }

    async fn require_account(&self, account_id: i64) -> Result<Account, ServiceError> {
        self.account_by_id(account_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("account {} not found", account_id)))
    }
}

fn permission_blob(set: std::collections::HashSet<Capability>) -> String {
    // Stored in catalog order so the blob is deterministic.
    let ordered: Vec<&str> = Capability::ALL
        .iter()
        .filter(|c| set.contains(c))
        .map(|c| c.as_str())
        .collect();
    serde_json::to_string(&ordered).expect("string array always serializes")
}

impl Account {
    fn role_str(&self) -> &'static str {
        match self.role {
            Role::Standard => "standard",
            Role::Admin => "admin",
            Role::Display => "display",
        }
    }
}
