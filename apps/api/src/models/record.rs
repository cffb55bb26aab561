use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single categorized career fact. Rows are immutable from the QA core's
/// perspective: it only ever reads a snapshot fetched by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecordRow {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a record. `category` is open-ended: the known
/// set (education / experience / skills / projects) gets friendly section
/// labels in the rendered context, anything else is still accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
