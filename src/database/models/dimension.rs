use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sentinel detail stored when a category has no submission for a month.
pub const EMPTY_DETAIL: &str = "无";

/// The six profile dimensions, in catalog order.
///
/// Every stored (person, month) snapshot has exactly one row per category.
/// `Family` is the sensitive category; its details are masked for viewers
/// without sensitive access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DimensionCategory {
    Ideology,
    Ability,
    Diligence,
    Performance,
    Integrity,
    Family,
}

impl DimensionCategory {
    pub const ALL: [DimensionCategory; 6] = [
        DimensionCategory::Ideology,
        DimensionCategory::Ability,
        DimensionCategory::Diligence,
        DimensionCategory::Performance,
        DimensionCategory::Integrity,
        DimensionCategory::Family,
    ];

    pub const SENSITIVE: DimensionCategory = DimensionCategory::Family;

    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionCategory::Ideology => "ideology",
            DimensionCategory::Ability => "ability",
            DimensionCategory::Diligence => "diligence",
            DimensionCategory::Performance => "performance",
            DimensionCategory::Integrity => "integrity",
            DimensionCategory::Family => "family",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DimensionCategory::Ideology => "思想",
            DimensionCategory::Ability => "能力",
            DimensionCategory::Diligence => "勤勉",
            DimensionCategory::Performance => "绩效",
            DimensionCategory::Integrity => "廉洁",
            DimensionCategory::Family => "家庭",
        }
    }

    pub fn is_sensitive(&self) -> bool {
        *self == Self::SENSITIVE
    }
}

impl fmt::Display for DimensionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DimensionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| s.to_string())
    }
}

/// One stored dimension row. Unique per (person_id, category, month).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DimensionRecord {
    pub id: i64,
    pub person_id: i64,
    pub category: DimensionCategory,
    /// `YYYY-MM` month key, as stored.
    pub month: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}
