use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/login - Authenticate and receive a JWT token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let account = state
        .accounts
        .authenticate(&payload.username, &payload.password)
        .await
        .map_err(|_| ApiError::unauthorized("invalid username or password"))?;

    let claims = Claims::new(account.id, account.username.clone());
    let token = generate_jwt(claims).map_err(|e| {
        tracing::error!("failed to generate JWT: {}", e);
        ApiError::internal_server_error("failed to issue token")
    })?;

    let expires_in = config::config().security.jwt_expiry_hours * 3600;
    Ok(Json(json!({
        "success": true,
        "data": {
            "token": token,
            "account": {
                "id": account.id,
                "username": account.username,
                "role": account.role,
            },
            "expires_in": expires_in,
        }
    })))
}
