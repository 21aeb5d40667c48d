use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Personnel record.
///
/// `birth_date` and `phone` are sensitive: they must never be serialized to a
/// viewer without passing through `sensitive::project_person` first.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub department: String,
    pub focus: String,
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
