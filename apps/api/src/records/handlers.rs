use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::record::{NewRecord, RecordRow};
use crate::records::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

/// POST /api/v1/resume
pub async fn handle_create_record(
    State(state): State<AppState>,
    Json(req): Json<NewRecord>,
) -> Result<Json<RecordRow>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if req.category.trim().is_empty() {
        return Err(AppError::Validation(
            "category must not be empty".to_string(),
        ));
    }
    let row = store::create_record(&state.db, &req).await?;
    Ok(Json(row))
}

/// GET /api/v1/resume?category=
pub async fn handle_list_records(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<RecordRow>>, AppError> {
    let rows = store::list_records(&state.db, params.category.as_deref()).await?;
    Ok(Json(rows))
}
