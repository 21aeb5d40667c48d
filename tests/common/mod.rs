use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use talent_api::database::models::Role;
use talent_api::database::schema;
use talent_api::routes::{app, AppState};
use talent_api::services::account_service::NewAccount;

/// In-process app over an in-memory database. Each test gets its own.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn spawn_app() -> Result<TestApp> {
    // One connection: every in-memory SQLite connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("failed to open in-memory database")?;
    schema::ensure_schema(&pool).await.context("schema bootstrap failed")?;

    let state = AppState::new(pool);
    Ok(TestApp {
        router: app(state.clone()),
        state,
    })
}

impl TestApp {
    /// Seed an account directly (the way the CLI bootstrap would) and return
    /// its id.
    pub async fn seed_account(
        &self,
        username: &str,
        role: Role,
        is_super_admin: bool,
        linked_person_id: Option<i64>,
    ) -> Result<i64> {
        let account = self
            .state
            .accounts
            .provision(NewAccount {
                username: username.to_string(),
                password: "pw".to_string(),
                role,
                is_super_admin,
                linked_person_id,
            })
            .await
            .context("failed to provision account")?;
        Ok(account.id)
    }

    /// Log in through the API and return the bearer token.
    pub async fn login(&self, username: &str) -> Result<String> {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": "pw" })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response had no token")
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body was not JSON")?
        };
        Ok((status, value))
    }
}
