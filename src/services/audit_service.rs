use chrono::Utc;
use sqlx::SqlitePool;
use tracing::error;

/// Append-only audit sink.
///
/// Recording is fire-and-forget: a failed insert is logged and swallowed,
/// never surfaced to the operation that triggered it.
#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        actor_id: Option<i64>,
        action: &str,
        entity_type: &str,
        entity_id: Option<i64>,
        detail: &str,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (actor_id, action, entity_type, entity_id, detail, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(detail)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            error!(action, entity_type, "failed to write audit entry: {}", e);
        }
    }
}
