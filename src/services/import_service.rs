use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::access::{self, Actor, Capability};
use crate::database::models::{DimensionCategory, Person};
use crate::services::dimension_service::{normalize_month, write_month_tx, SubmittedDimension};
use crate::services::person_service::{insert_person_conn, update_person_conn, NewPerson, PersonUpdate};
use crate::services::{AuditService, ServiceError};
use crate::types::MonthKey;

/// A parsed spreadsheet row: header-indexed string cells. The tabular-file
/// parser itself is a collaborator; this service only sees its output.
pub type ImportRow = HashMap<String, String>;

/// Row columns that must be non-blank on every non-empty row.
pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "title", "department", "focus"];

/// Outcome of one import invocation.
///
/// `needs_confirm` is a signal, not an error: the dry phase finished its
/// updates but found names it will not create without explicit caller
/// intent (`allow_create = true`, typically the same file resubmitted).
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub needs_confirm: bool,
    pub pending_names: Vec<String>,
}

/// One validated row, ready to execute.
#[derive(Debug, Clone)]
struct RowPlan {
    name: String,
    fields: PersonUpdate,
    new_person: NewPerson,
    month: MonthKey,
    dimensions: Vec<(DimensionCategory, String)>,
}

fn cell<'a>(row: &'a ImportRow, key: &str) -> Option<&'a str> {
    row.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn is_blank(row: &ImportRow) -> bool {
    row.values().all(|v| v.trim().is_empty())
}

/// Validate and normalize every row up front. Any violation anywhere rejects
/// the whole batch, with one message per problem so the caller can fix the
/// file in a single pass. Entirely-blank rows are dropped silently.
fn plan_rows(rows: &[ImportRow], fallback_month: MonthKey) -> Result<Vec<RowPlan>, Vec<String>> {
    let mut violations = Vec::new();
    let mut plans = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        if is_blank(row) {
            continue;
        }
        let row_no = index + 1;

        for column in REQUIRED_COLUMNS {
            if cell(row, column).is_none() {
                violations.push(format!("row {}: missing required field '{}'", row_no, column));
            }
        }

        // A month cell that is not strict YYYY-MM is discarded in favor of
        // the fallback, never an error.
        let month = cell(row, "month")
            .and_then(|m| m.parse::<MonthKey>().ok())
            .unwrap_or(fallback_month);

        let birth_date =
            cell(row, "birth_date").and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        let submitted: Vec<SubmittedDimension> = DimensionCategory::ALL
            .iter()
            .filter_map(|category| {
                cell(row, category.as_str()).map(|detail| SubmittedDimension {
                    category: category.as_str().to_string(),
                    detail: detail.to_string(),
                })
            })
            .collect();
        let dimensions = match normalize_month(&submitted) {
            Ok(rows) => rows,
            Err(errs) => {
                violations.extend(errs.into_iter().map(|e| format!("row {}: {}", row_no, e)));
                continue;
            }
        };

        let name = cell(row, "name").unwrap_or_default().to_string();
        if name.is_empty() {
            // already reported as a missing required field
            continue;
        }

        plans.push(RowPlan {
            name: name.clone(),
            fields: PersonUpdate {
                name: None,
                title: cell(row, "title").map(str::to_string),
                department: cell(row, "department").map(str::to_string),
                focus: cell(row, "focus").map(str::to_string),
                bio: cell(row, "bio").map(str::to_string),
                birth_date,
                phone: cell(row, "phone").map(str::to_string),
            },
            new_person: NewPerson {
                name,
                title: cell(row, "title").unwrap_or_default().to_string(),
                department: cell(row, "department").unwrap_or_default().to_string(),
                focus: cell(row, "focus").unwrap_or_default().to_string(),
                bio: cell(row, "bio").unwrap_or_default().to_string(),
                birth_date,
                phone: cell(row, "phone").map(str::to_string),
            },
            month,
            dimensions,
        });
    }

    if violations.is_empty() {
        Ok(plans)
    } else {
        Err(violations)
    }
}

/// Spreadsheet reconciliation importer.
///
/// Two phases per invocation, chosen by the caller's `allow_create` flag;
/// nothing is remembered between calls. The dry phase updates every row that
/// matches an existing person by exact name and defers the rest; the confirm
/// phase creates them. Either way the whole batch is one transaction.
#[derive(Clone)]
pub struct ImportService {
    pool: SqlitePool,
    audit: AuditService,
}

impl ImportService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    pub async fn run(
        &self,
        actor: &Actor,
        rows: &[ImportRow],
        allow_create: bool,
        fallback_month: MonthKey,
    ) -> Result<ImportOutcome, ServiceError> {
        if !access::has_capability(actor, Capability::ImportRun) {
            return Err(ServiceError::Forbidden);
        }

        let plans = plan_rows(rows, fallback_month).map_err(ServiceError::Validation)?;

        let mut created = 0u32;
        let mut updated = 0u32;
        let mut skipped = 0u32;
        let mut pending_names: Vec<String> = Vec::new();
        // Names created earlier in this same batch; a second row for the same
        // new name updates it instead of duplicating it.
        let mut created_in_batch: HashMap<String, i64> = HashMap::new();

        let mut tx = self.pool.begin().await?;
        for plan in &plans {
            let matched = match created_in_batch.get(&plan.name) {
                Some(id) => Some(*id),
                None => person_id_by_name(&mut tx, &plan.name).await?,
            };

            match matched {
                Some(person_id) => {
                    let current =
                        sqlx::query_as::<_, Person>("SELECT * FROM people WHERE id = ?")
                            .bind(person_id)
                            .fetch_one(&mut *tx)
                            .await?;
                    update_person_conn(&mut tx, &current, &plan.fields).await?;
                    write_month_tx(&mut tx, person_id, plan.month, &plan.dimensions).await?;
                    updated += 1;
                }
                None if allow_create => {
                    let person = insert_person_conn(&mut tx, &plan.new_person).await?;
                    write_month_tx(&mut tx, person.id, plan.month, &plan.dimensions).await?;
                    created_in_batch.insert(plan.name.clone(), person.id);
                    created += 1;
                }
                None => {
                    skipped += 1;
                    if !pending_names.contains(&plan.name) {
                        pending_names.push(plan.name.clone());
                    }
                }
            }
        }
        tx.commit().await?;

        let needs_confirm = !pending_names.is_empty();
        info!(created, updated, skipped, needs_confirm, "import finished");
        self.audit
            .record(
                Some(actor.account_id),
                "people.import",
                "import",
                None,
                &format!("created={} updated={} skipped={}", created, updated, skipped),
            )
            .await;

        Ok(ImportOutcome {
            created,
            updated,
            skipped,
            needs_confirm,
            pending_names,
        })
    }

    /// Bulk export: one header-indexed row per person per requested month,
    /// in the same column layout the importer accepts. Sensitive fields and
    /// the sensitive category are projected per viewer before anything
    /// leaves the service.
    pub async fn export(
        &self,
        actor: &Actor,
        months: &[MonthKey],
    ) -> Result<Vec<ImportRow>, ServiceError> {
        if !access::has_capability(actor, Capability::ExportRun) {
            return Err(ServiceError::Forbidden);
        }

        let persons = sqlx::query_as::<_, Person>("SELECT * FROM people ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut rows = Vec::with_capacity(persons.len() * months.len());
        for person in &persons {
            let view = crate::sensitive::project_person(person, actor);
            for month in months {
                let stored: Vec<(DimensionCategory, String)> = sqlx::query_as(
                    "SELECT category, detail FROM dimension_records WHERE person_id = ? AND month = ?",
                )
                .bind(person.id)
                .bind(month.to_string())
                .fetch_all(&self.pool)
                .await?;
                let by_category: HashMap<DimensionCategory, String> = stored.into_iter().collect();

                let mut details: Vec<(DimensionCategory, String)> = DimensionCategory::ALL
                    .iter()
                    .map(|c| {
                        (
                            *c,
                            by_category
                                .get(c)
                                .cloned()
                                .unwrap_or_else(|| crate::database::models::EMPTY_DETAIL.to_string()),
                        )
                    })
                    .collect();
                crate::sensitive::project_dimensions(
                    details.iter_mut().map(|(c, d)| (*c, d)),
                    actor,
                    person.id,
                );

                let mut row: ImportRow = HashMap::new();
                row.insert("name".into(), view.name.clone());
                row.insert("title".into(), view.title.clone());
                row.insert("department".into(), view.department.clone());
                row.insert("focus".into(), view.focus.clone());
                row.insert("bio".into(), view.bio.clone());
                row.insert("phone".into(), view.phone.clone().unwrap_or_default());
                row.insert("birth_date".into(), view.birth_date.clone().unwrap_or_default());
                row.insert("month".into(), month.to_string());
                for (category, detail) in details {
                    row.insert(category.as_str().to_string(), detail);
                }
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

/// Exact-name match. Ambiguous names resolve to the oldest record.
async fn person_id_by_name(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    name: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM people WHERE name = ? ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(|r| r.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::EMPTY_DETAIL;
    use crate::testing;

    fn row(pairs: &[(&str, &str)]) -> ImportRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn full_row(name: &str) -> ImportRow {
        row(&[
            ("name", name),
            ("title", "工程师"),
            ("department", "研发部"),
            ("focus", "架构"),
            ("ideology", "good"),
        ])
    }

    fn month() -> MonthKey {
        "2025-06".parse().unwrap()
    }

    async fn person_count(ctx: &testing::TestContext) -> i64 {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM people")
            .fetch_one(ctx.pool())
            .await
            .unwrap();
        count.0
    }

    #[tokio::test]
    async fn dry_phase_updates_matches_and_defers_unknown_names() {
        let ctx = testing::TestContext::new().await;
        let known_id = ctx.insert_person("李四").await;
        let admin = testing::admin_actor();

        let rows = vec![full_row("李四"), full_row("张三")];
        let outcome = ctx.imports().run(&admin, &rows, false, month()).await.unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.needs_confirm);
        assert_eq!(outcome.pending_names, vec!["张三".to_string()]);

        // the unmatched name was not created
        assert_eq!(person_count(&ctx).await, 1);

        // the matched row's month was written even in the dry phase
        let dims: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM dimension_records WHERE person_id = ?")
                .bind(known_id)
                .fetch_one(ctx.pool())
                .await
                .unwrap();
        assert_eq!(dims.0, 6);
    }

    #[tokio::test]
    async fn confirm_phase_creates_exactly_the_pending_names() {
        let ctx = testing::TestContext::new().await;
        ctx.insert_person("李四").await;
        let admin = testing::admin_actor();
        let rows = vec![full_row("李四"), full_row("张三")];

        let dry = ctx.imports().run(&admin, &rows, false, month()).await.unwrap();
        let before = person_count(&ctx).await;

        let confirm = ctx.imports().run(&admin, &rows, true, month()).await.unwrap();
        assert_eq!(confirm.created as usize, dry.pending_names.len());
        assert_eq!(confirm.updated, 1);
        assert_eq!(confirm.skipped, 0);
        assert!(!confirm.needs_confirm);
        assert!(confirm.pending_names.is_empty());

        assert_eq!(person_count(&ctx).await, before + dry.pending_names.len() as i64);
    }

    #[tokio::test]
    async fn blank_rows_are_skipped_silently() {
        let ctx = testing::TestContext::new().await;
        let admin = testing::admin_actor();
        let rows = vec![
            row(&[("name", ""), ("title", "  "), ("department", "")]),
            full_row("张三"),
        ];

        let outcome = ctx.imports().run(&admin, &rows, true, month()).await.unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped, 0);
    }

    #[tokio::test]
    async fn missing_required_fields_reject_the_whole_batch() {
        let ctx = testing::TestContext::new().await;
        let admin = testing::admin_actor();
        let rows = vec![
            full_row("张三"),
            row(&[("name", "王五"), ("title", "工程师")]), // no department, no focus
        ];

        let err = ctx.imports().run(&admin, &rows, true, month()).await.unwrap_err();
        match err {
            ServiceError::Validation(violations) => {
                assert_eq!(violations.len(), 2);
                assert!(violations.iter().all(|v| v.starts_with("row 2:")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        // no partial commit: the valid first row was not applied either
        assert_eq!(person_count(&ctx).await, 0);
    }

    #[tokio::test]
    async fn malformed_month_falls_back_to_current() {
        let ctx = testing::TestContext::new().await;
        let admin = testing::admin_actor();
        let mut bad_month = full_row("张三");
        bad_month.insert("month".into(), "2025/07".into());

        ctx.imports().run(&admin, &[bad_month], true, month()).await.unwrap();

        let months: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT month FROM dimension_records")
                .fetch_all(ctx.pool())
                .await
                .unwrap();
        assert_eq!(months, vec![(month().to_string(),)]);
    }

    #[tokio::test]
    async fn explicit_month_is_honored() {
        let ctx = testing::TestContext::new().await;
        let admin = testing::admin_actor();
        let mut with_month = full_row("张三");
        with_month.insert("month".into(), "2025-03".into());

        ctx.imports().run(&admin, &[with_month], true, month()).await.unwrap();

        let months: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT month FROM dimension_records")
                .fetch_all(ctx.pool())
                .await
                .unwrap();
        assert_eq!(months, vec![("2025-03".to_string(),)]);
    }

    #[tokio::test]
    async fn duplicate_new_name_in_one_batch_creates_once() {
        let ctx = testing::TestContext::new().await;
        let admin = testing::admin_actor();
        let rows = vec![full_row("张三"), full_row("张三")];

        let outcome = ctx.imports().run(&admin, &rows, true, month()).await.unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 1);
        assert_eq!(person_count(&ctx).await, 1);
    }

    #[tokio::test]
    async fn dimension_cells_are_written_with_sentinel_fill() {
        let ctx = testing::TestContext::new().await;
        let admin = testing::admin_actor();

        ctx.imports().run(&admin, &[full_row("张三")], true, month()).await.unwrap();

        let details: Vec<(String, String)> = sqlx::query_as(
            "SELECT category, detail FROM dimension_records ORDER BY id",
        )
        .fetch_all(ctx.pool())
        .await
        .unwrap();
        assert_eq!(details.len(), 6);
        assert_eq!(details[0], ("ideology".to_string(), "good".to_string()));
        assert!(details[1..].iter().all(|(_, d)| d == EMPTY_DETAIL));
    }

    #[tokio::test]
    async fn import_requires_the_capability() {
        let ctx = testing::TestContext::new().await;
        let outsider = testing::standard_actor(None);
        let err = ctx.imports().run(&outsider, &[full_row("张三")], false, month()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));
    }
}
