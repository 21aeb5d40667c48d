use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::Actor;
use crate::config;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::services::import_service::ImportRow;
use crate::types::MonthKey;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// Dry phase when false: matched rows are updated, unmatched names are
    /// reported back for confirmation. Resubmitting the same payload with
    /// `allow_create = true` creates them; there is no server-side batch
    /// state between the two calls.
    #[serde(default)]
    pub allow_create: bool,
    pub rows: Vec<ImportRow>,
}

/// POST /api/people/import - Two-phase spreadsheet reconciliation import
pub async fn run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .imports
        .run(&actor, &payload.rows, payload.allow_create, MonthKey::current())
        .await?;
    Ok(Json(json!({ "success": true, "data": outcome })))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub months: Option<u32>,
}

/// GET /api/people/export - Rows in the import column layout, one per person
/// per month, masked for the viewer.
pub async fn export(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<Value>, ApiError> {
    let n = query
        .months
        .unwrap_or(config::config().api.default_history_months);
    let months = MonthKey::last_n_months(MonthKey::current(), n);
    let rows = state.imports.export(&actor, &months).await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}
