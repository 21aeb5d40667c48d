use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::access::{self, Actor};
use crate::database::models::{DimensionCategory, DimensionRecord, EMPTY_DETAIL};
use crate::sensitive;
use crate::services::{AuditService, ServiceError};
use crate::types::MonthKey;

/// One submitted (category, detail) pair. The category arrives as a raw
/// string so an unknown label is a validation failure, not a parse panic.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedDimension {
    pub category: String,
    #[serde(default)]
    pub detail: String,
}

/// One category entry of a materialized month snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub category: DimensionCategory,
    pub label: &'static str,
    pub detail: String,
}

/// Full six-category snapshot for one month, in catalog order.
#[derive(Debug, Clone, Serialize)]
pub struct MonthSnapshot {
    pub month: MonthKey,
    pub entries: Vec<SnapshotEntry>,
}

/// Normalize a submission into exactly six (category, detail) pairs in
/// catalog order. Unknown categories fail the whole submission, every
/// violation reported. Blank or missing details become the `"无"` sentinel;
/// duplicate submissions for a category keep the last one.
pub fn normalize_month(
    submitted: &[SubmittedDimension],
) -> Result<Vec<(DimensionCategory, String)>, Vec<String>> {
    let mut violations = Vec::new();
    let mut by_category: HashMap<DimensionCategory, String> = HashMap::new();

    for dim in submitted {
        match dim.category.parse::<DimensionCategory>() {
            Ok(category) => {
                by_category.insert(category, dim.detail.trim().to_string());
            }
            Err(raw) => violations.push(format!("unknown dimension category: {}", raw)),
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(DimensionCategory::ALL
        .iter()
        .map(|category| {
            let detail = match by_category.remove(category) {
                Some(d) if !d.is_empty() => d,
                _ => EMPTY_DETAIL.to_string(),
            };
            (*category, detail)
        })
        .collect())
}

/// Swap a person's month inside an already-open transaction: delete whatever
/// the month holds, insert the six normalized rows. The importer shares this
/// path so batch writes stay on a single transaction.
pub async fn write_month_tx(
    conn: &mut SqliteConnection,
    person_id: i64,
    month: MonthKey,
    rows: &[(DimensionCategory, String)],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM dimension_records WHERE person_id = ? AND month = ?")
        .bind(person_id)
        .bind(month.to_string())
        .execute(&mut *conn)
        .await?;

    let now = Utc::now();
    for (category, detail) in rows {
        sqlx::query(
            r#"
            INSERT INTO dimension_records (person_id, category, month, detail, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(person_id)
        .bind(category)
        .bind(month.to_string())
        .bind(detail)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Monthly dimension snapshot store.
///
/// Months are only ever written whole: a save replaces all six rows of
/// (person, month) atomically, and reads materialize all six categories even
/// when nothing was ever stored.
#[derive(Clone)]
pub struct DimensionService {
    pool: SqlitePool,
    audit: AuditService,
}

impl DimensionService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    /// Replace one person-month with the submitted dimensions.
    /// Idempotent: resubmitting the same input yields the same six rows.
    pub async fn replace_month(
        &self,
        actor: &Actor,
        person_id: i64,
        month: MonthKey,
        submitted: &[SubmittedDimension],
    ) -> Result<(), ServiceError> {
        if !access::can_edit_dimensions(actor, person_id) {
            return Err(ServiceError::Forbidden);
        }
        self.require_person(person_id).await?;

        let rows = normalize_month(submitted).map_err(ServiceError::Validation)?;

        let mut tx = self.pool.begin().await?;
        write_month_tx(&mut tx, person_id, month, &rows).await?;
        tx.commit().await?;

        info!(person_id, month = %month, "replaced dimension month");
        self.audit
            .record(
                Some(actor.account_id),
                "dimensions.replace",
                "person",
                Some(person_id),
                &month.to_string(),
            )
            .await;
        Ok(())
    }

    /// Materialized snapshots for the requested months, oldest-first in the
    /// order given, sensitive filter applied. A person with no history gets
    /// the all-`"无"` projection rather than an empty structure.
    pub async fn read_range(
        &self,
        actor: &Actor,
        person_id: i64,
        months: &[MonthKey],
    ) -> Result<Vec<MonthSnapshot>, ServiceError> {
        if !access::can_view_person(actor, person_id) {
            return Err(ServiceError::Forbidden);
        }
        self.require_person(person_id).await?;

        let stored = self.rows_for_months(person_id, months).await?;
        let mut by_key: HashMap<(String, DimensionCategory), String> = stored
            .into_iter()
            .map(|r| ((r.month.clone(), r.category), r.detail))
            .collect();

        let mut snapshots = Vec::with_capacity(months.len());
        for month in months {
            let mut entries: Vec<SnapshotEntry> = DimensionCategory::ALL
                .iter()
                .map(|category| SnapshotEntry {
                    category: *category,
                    label: category.label(),
                    detail: by_key
                        .remove(&(month.to_string(), *category))
                        .unwrap_or_else(|| EMPTY_DETAIL.to_string()),
                })
                .collect();
            sensitive::project_dimensions(
                entries.iter_mut().map(|e| (e.category, &mut e.detail)),
                actor,
                person_id,
            );
            snapshots.push(MonthSnapshot { month: *month, entries });
        }
        Ok(snapshots)
    }

    async fn rows_for_months(
        &self,
        person_id: i64,
        months: &[MonthKey],
    ) -> Result<Vec<DimensionRecord>, ServiceError> {
        if months.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; months.len()].join(", ");
        let sql = format!(
            "SELECT * FROM dimension_records WHERE person_id = ? AND month IN ({}) ORDER BY month",
            placeholders
        );
        let mut query = sqlx::query_as::<_, DimensionRecord>(&sql).bind(person_id);
        for month in months {
            query = query.bind(month.to_string());
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn require_person(&self, person_id: i64) -> Result<(), ServiceError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM people WHERE id = ?")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!("person {} not found", person_id))),
        }
    }
}
