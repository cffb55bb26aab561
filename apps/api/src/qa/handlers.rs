use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::records::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

/// POST /api/v1/ask
///
/// A storage failure here is a request failure (500). An inference failure
/// is not: the orchestrator folds it into the answer string, so the client
/// always gets a normal response shape.
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let records = store::list_records(&state.db, None).await?;
    let answer = state.answerer.answer_question(&req.question, &records).await;
    Ok(Json(AskResponse {
        question: req.question,
        answer,
    }))
}
