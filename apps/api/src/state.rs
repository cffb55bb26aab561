use sqlx::SqlitePool;
use std::sync::Arc;

use crate::qa::Answerer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub answerer: Arc<Answerer>,
}
