use sqlx::SqlitePool;

use crate::database::manager::DatabaseError;

/// Idempotent schema bootstrap, executed at startup and by `talent init`.
const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS people (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        title       TEXT NOT NULL DEFAULT '',
        department  TEXT NOT NULL DEFAULT '',
        focus       TEXT NOT NULL DEFAULT '',
        bio         TEXT NOT NULL DEFAULT '',
        birth_date  TEXT,
        phone       TEXT,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        username           TEXT NOT NULL UNIQUE,
        password_digest    TEXT NOT NULL,
        role               TEXT NOT NULL DEFAULT 'standard',
        permissions        TEXT NOT NULL DEFAULT '[]',
        is_super_admin     INTEGER NOT NULL DEFAULT 0,
        sensitive_unmasked INTEGER NOT NULL DEFAULT 0,
        linked_person_id   INTEGER REFERENCES people(id) ON DELETE SET NULL,
        created_at         TEXT NOT NULL,
        updated_at         TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dimension_records (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        person_id  INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
        category   TEXT NOT NULL,
        month      TEXT NOT NULL,
        detail     TEXT NOT NULL DEFAULT '无',
        created_at TEXT NOT NULL,
        UNIQUE (person_id, category, month)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_dimension_records_person_month
        ON dimension_records (person_id, month)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audit_log (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        actor_id    INTEGER,
        action      TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id   INTEGER,
        detail      TEXT NOT NULL DEFAULT '',
        created_at  TEXT NOT NULL
    )
    "#,
];

pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
    for stmt in STATEMENTS {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
