//! Test fixtures: an in-memory database with the full schema, service
//! constructors wired to it, and ready-made actors for each role.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::access::{defaults, Actor};
use crate::database::models::Role;
use crate::database::schema;
use crate::services::{
    AccountService, AuditService, DimensionService, ImportService, PersonService,
};

pub struct TestContext {
    pool: SqlitePool,
}

impl TestContext {
    pub async fn new() -> Self {
        // One connection: each in-memory SQLite connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        schema::ensure_schema(&pool).await.expect("schema bootstrap");
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn audit(&self) -> AuditService {
        AuditService::new(self.pool.clone())
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.pool.clone(), self.audit())
    }

    pub fn people(&self) -> PersonService {
        PersonService::new(self.pool.clone(), self.audit())
    }

    pub fn dimensions(&self) -> DimensionService {
        DimensionService::new(self.pool.clone(), self.audit())
    }

    pub fn imports(&self) -> ImportService {
        ImportService::new(self.pool.clone(), self.audit())
    }

    pub async fn insert_person(&self, name: &str) -> i64 {
        let now = Utc::now();
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO people (name, title, department, focus, bio, created_at, updated_at)
            VALUES (?, '', '', '', '', ?, ?)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .expect("insert person fixture");
        row.0
    }

    pub async fn insert_account_linked(&self, username: &str, person_id: i64) -> i64 {
        let now = Utc::now();
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO accounts
                (username, password_digest, role, permissions, is_super_admin,
                 sensitive_unmasked, linked_person_id, created_at, updated_at)
            VALUES (?, '', 'standard', '[]', 0, 0, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(person_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .expect("insert account fixture");
        row.0
    }
}

fn actor_with_role(role: Role, linked_person_id: Option<i64>) -> Actor {
    Actor {
        account_id: 1000,
        username: format!("test-{:?}", role).to_lowercase(),
        role,
        permissions: defaults::default_permissions(role, false),
        is_super_admin: false,
        sensitive_unmasked: false,
        linked_person_id,
    }
}

pub fn admin_actor() -> Actor {
    actor_with_role(Role::Admin, None)
}

pub fn standard_actor(linked_person_id: Option<i64>) -> Actor {
    actor_with_role(Role::Standard, linked_person_id)
}

pub fn display_actor() -> Actor {
    actor_with_role(Role::Display, None)
}

pub fn super_admin_actor() -> Actor {
    let mut actor = actor_with_role(Role::Admin, None);
    actor.is_super_admin = true;
    actor
}
