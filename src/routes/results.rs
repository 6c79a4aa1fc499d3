use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, response::Response,
    routing::get, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::{error_response, AppState};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/results", get(handler))
}

/// Optional exact-match city filter shared by the read endpoints.
#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
}

impl CityQuery {
    /// The filter to apply; an empty `?city=` means no filter.
    pub fn filter(&self) -> Option<&str> {
        self.city.as_deref().filter(|c| !c.is_empty())
    }
}

async fn handler(Query(params): Query<CityQuery>, State(state): State<AppState>) -> Response {
    // ---
    let city = params.filter();
    info!("GET /results - city filter: {:?}", city);

    match state.store.list(city).await {
        Ok(rows) => {
            info!("GET /results - returning {} rows", rows.len());
            (StatusCode::OK, Json(json!({ "data": rows }))).into_response()
        }
        Err(e) => {
            error!("Failed to list summaries: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database connection failed.",
            )
        }
    }
}
