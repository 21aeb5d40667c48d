use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use crate::access::Actor;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::services::person_service::{NewPerson, PersonUpdate};

/// GET /api/people - List persons visible to the actor
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, ApiError> {
    let persons = state.people.list(&actor).await?;
    Ok(Json(json!({ "success": true, "data": persons })))
}

/// GET /api/people/:id - Fetch one person, projected for the viewer
pub async fn get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(person_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let person = state.people.get(&actor, person_id).await?;
    Ok(Json(json!({ "success": true, "data": person })))
}

/// POST /api/people - Create a person
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewPerson>,
) -> Result<Json<Value>, ApiError> {
    let person = state.people.create(&actor, payload).await?;
    Ok(Json(json!({ "success": true, "data": person })))
}

/// PUT /api/people/:id - Update a person (partial)
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(person_id): Path<i64>,
    Json(payload): Json<PersonUpdate>,
) -> Result<Json<Value>, ApiError> {
    let person = state.people.update(&actor, person_id, payload).await?;
    Ok(Json(json!({ "success": true, "data": person })))
}

/// DELETE /api/people/:id - Delete a person, their dimension history with
/// them; linked accounts are detached, not removed.
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(person_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.people.delete(&actor, person_id).await?;
    Ok(Json(json!({ "success": true, "data": { "deleted": person_id } })))
}
