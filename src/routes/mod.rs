use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use crate::{RecommendationService, SummaryStore};

mod analysis;
mod health;
mod recommend;
mod results;

// ---

/// Shared handler state: the pairing service and read access to its summaries.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecommendationService>,
    pub store: Arc<dyn SummaryStore>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(recommend::router())
        .merge(results::router())
        .merge(analysis::router())
        .merge(health::router())
        .with_state(state)
}

/// `{"error": message}` with the given status.
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}
