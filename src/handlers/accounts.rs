use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::Actor;
use crate::database::models::Role;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::services::account_service::NewAccount;

/// GET /api/accounts/me - The resolved actor, with the materialized
/// permission list (full catalog for super-admins) and catalog labels.
pub async fn whoami(Extension(actor): Extension<Actor>) -> Json<Value> {
    let permissions: Vec<Value> = actor
        .materialized_permissions()
        .iter()
        .map(|c| json!({ "token": c.as_str(), "label": c.label() }))
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "id": actor.account_id,
            "username": actor.username,
            "role": actor.role,
            "is_super_admin": actor.is_super_admin,
            "sensitive_unmasked": actor.sensitive_unmasked,
            "linked_person_id": actor.linked_person_id,
            "permissions": permissions,
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct SensitivePreference {
    pub unmasked: bool,
}

/// PUT /api/accounts/me/sensitive - Toggle the unmasked-viewing preference
pub async fn set_sensitive(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<SensitivePreference>,
) -> Result<Json<Value>, ApiError> {
    let account = state
        .accounts
        .set_sensitive_unmasked(&actor, payload.unmasked)
        .await?;
    Ok(Json(json!({
        "success": true,
        "data": { "sensitive_unmasked": account.sensitive_unmasked }
    })))
}

/// POST /api/accounts - Provision an account with its role's defaults
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewAccount>,
) -> Result<Json<Value>, ApiError> {
    let account = state.accounts.create(&actor, payload).await?;
    Ok(Json(json!({ "success": true, "data": account })))
}

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

/// PUT /api/accounts/:id/role - Change role; permissions reset to the new
/// role's defaults, discarding custom grants.
pub async fn change_role(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(account_id): Path<i64>,
    Json(payload): Json<RoleChange>,
) -> Result<Json<Value>, ApiError> {
    let account = state.accounts.change_role(&actor, account_id, payload.role).await?;
    Ok(Json(json!({ "success": true, "data": account })))
}

#[derive(Debug, Deserialize)]
pub struct PermissionGrant {
    pub permissions: Vec<String>,
}

/// PUT /api/accounts/:id/permissions - Replace the explicit permission set
pub async fn set_permissions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(account_id): Path<i64>,
    Json(payload): Json<PermissionGrant>,
) -> Result<Json<Value>, ApiError> {
    let account = state
        .accounts
        .set_permissions(&actor, account_id, &payload.permissions)
        .await?;
    Ok(Json(json!({ "success": true, "data": account })))
}

/// DELETE /api/accounts/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(account_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.accounts.delete(&actor, account_id).await?;
    Ok(Json(json!({ "success": true, "data": { "deleted": account_id } })))
}
