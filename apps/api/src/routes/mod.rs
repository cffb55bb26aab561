pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::qa;
use crate::records;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Resume records (storage collaborator)
        .route(
            "/api/v1/resume",
            post(records::handlers::handle_create_record).get(records::handlers::handle_list_records),
        )
        // Question answering
        .route("/api/v1/ask", post(qa::handlers::handle_ask))
        .with_state(state)
}
