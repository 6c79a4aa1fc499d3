use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, response::Response,
    routing::get, Json, Router,
};
use serde_json::json;
use tracing::{error, info, warn};

use super::results::CityQuery;
use super::{error_response, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/analysis", get(handler))
}

/// Latest summary, optionally for one city. No match is a 404.
async fn handler(Query(params): Query<CityQuery>, State(state): State<AppState>) -> Response {
    // ---
    let city = params.filter();
    info!("GET /analysis - city filter: {:?}", city);

    match state.store.latest(city).await {
        Ok(Some(row)) => (StatusCode::OK, Json(json!({ "summary": row.summary }))).into_response(),
        Ok(None) => {
            warn!("No summary found for city: {:?}", city);
            error_response(StatusCode::NOT_FOUND, "No summary available.")
        }
        Err(e) => {
            error!("Failed to read latest summary: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database connection failed.",
            )
        }
    }
}
