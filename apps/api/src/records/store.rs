use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::record::{NewRecord, RecordRow};

/// Inserts a record and returns the stored row.
pub async fn create_record(db: &SqlitePool, new: &NewRecord) -> Result<RecordRow, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, RecordRow>(
        r#"
        INSERT INTO resume_entries
            (category, title, description, start_date, end_date, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        RETURNING *
        "#,
    )
    .bind(&new.category)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(now)
    .fetch_one(db)
    .await
}

/// Lists records, optionally filtered by category, in insertion order.
/// The QA core relies on this being a committed, stable snapshot.
pub async fn list_records(
    db: &SqlitePool,
    category: Option<&str>,
) -> Result<Vec<RecordRow>, sqlx::Error> {
    match category {
        Some(category) => {
            sqlx::query_as::<_, RecordRow>(
                "SELECT * FROM resume_entries WHERE category = ?1 ORDER BY id",
            )
            .bind(category)
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, RecordRow>("SELECT * FROM resume_entries ORDER BY id")
                .fetch_all(db)
                .await
        }
    }
}
