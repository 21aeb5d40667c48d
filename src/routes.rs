use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::services::{AccountService, AuditService, DimensionService, ImportService, PersonService};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub accounts: AccountService,
    pub people: PersonService,
    pub dimensions: DimensionService,
    pub imports: ImportService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditService::new(pool.clone());
        Self {
            accounts: AccountService::new(pool.clone(), audit.clone()),
            people: PersonService::new(pool.clone(), audit.clone()),
            dimensions: DimensionService::new(pool.clone(), audit.clone()),
            imports: ImportService::new(pool.clone(), audit),
            pool,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        // Protected API
        .merge(people_routes(&state))
        .merge(account_routes(&state))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn people_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/people", get(handlers::people::list).post(handlers::people::create))
        // static segments before the :id routes
        .route("/api/people/import", post(handlers::imports::run))
        .route("/api/people/export", get(handlers::imports::export))
        .route(
            "/api/people/:id",
            get(handlers::people::get)
                .put(handlers::people::update)
                .delete(handlers::people::delete),
        )
        .route("/api/people/:id/dimensions", get(handlers::dimensions::read_range))
        .route(
            "/api/people/:id/dimensions/:month",
            put(handlers::dimensions::replace_month),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ))
}

fn account_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/accounts", post(handlers::accounts::create))
        .route("/api/accounts/me", get(handlers::accounts::whoami))
        .route("/api/accounts/me/sensitive", put(handlers::accounts::set_sensitive))
        .route("/api/accounts/:id", delete(handlers::accounts::delete))
        .route("/api/accounts/:id/role", put(handlers::accounts::change_role))
        .route(
            "/api/accounts/:id/permissions",
            put(handlers::accounts::set_permissions),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Talent API",
            "version": version,
            "description": "HR talent archive backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "login": "/auth/login (public - token acquisition)",
                "accounts": "/api/accounts/* (protected - account management)",
                "people": "/api/people[/:id] (protected)",
                "dimensions": "/api/people/:id/dimensions[/:month] (protected)",
                "import": "/api/people/import (protected)",
                "export": "/api/people/export (protected)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::health_check(&state.pool).await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
