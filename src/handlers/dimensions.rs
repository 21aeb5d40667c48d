use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::Actor;
use crate::config;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::services::dimension_service::SubmittedDimension;
use crate::types::MonthKey;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// Window size ending at the current month. Ignored when from/to given.
    pub months: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /api/people/:id/dimensions - Month snapshots for a person.
/// Either `?from=YYYY-MM&to=YYYY-MM` or `?months=N` (default window from
/// config, anchored at the current month).
pub async fn read_range(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(person_id): Path<i64>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, ApiError> {
    let months = resolve_months(&query)?;
    let snapshots = state.dimensions.read_range(&actor, person_id, &months).await?;
    Ok(Json(json!({ "success": true, "data": snapshots })))
}

fn resolve_months(query: &RangeQuery) -> Result<Vec<MonthKey>, ApiError> {
    match (&query.from, &query.to) {
        (Some(from), Some(to)) => {
            let start: MonthKey = from
                .parse()
                .map_err(|_| ApiError::bad_request(format!("invalid month: {}", from)))?;
            let end: MonthKey = to
                .parse()
                .map_err(|_| ApiError::bad_request(format!("invalid month: {}", to)))?;
            Ok(MonthKey::months_between(start, end))
        }
        (None, None) => {
            let n = query
                .months
                .unwrap_or(config::config().api.default_history_months);
            Ok(MonthKey::last_n_months(MonthKey::current(), n))
        }
        _ => Err(ApiError::bad_request("from and to must be given together")),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplaceMonthRequest {
    pub dimensions: Vec<SubmittedDimension>,
}

/// PUT /api/people/:id/dimensions/:month - Replace one person-month whole.
pub async fn replace_month(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((person_id, month)): Path<(i64, String)>,
    Json(payload): Json<ReplaceMonthRequest>,
) -> Result<Json<Value>, ApiError> {
    let month: MonthKey = month
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid month: {}", month)))?;

    state
        .dimensions
        .replace_month(&actor, person_id, month, &payload.dimensions)
        .await?;
    Ok(Json(json!({ "success": true, "data": { "person_id": person_id, "month": month } })))
}
