use axum::{
    extract::rejection::JsonRejection, extract::State, http::StatusCode, response::IntoResponse,
    response::Response, routing::post, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::{error_response, AppState};
use crate::{RecommendError, Recommendation};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/fetch_and_process", post(handler))
}

/// Body of `POST /fetch_and_process`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    question: String,
}

async fn handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    // ---
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!("POST /fetch_and_process - rejected body: {}", rejection.body_text());
            return error_response(rejection.status(), rejection.body_text());
        }
    };
    info!("POST /fetch_and_process - question: {}", body.question);

    match state.service.recommend(&body.question).await {
        Ok(Recommendation::Created(summary)) => {
            debug!("POST /fetch_and_process - Returning CREATED");
            (StatusCode::CREATED, Json(json!({ "summary": summary }))).into_response()
        }
        Ok(Recommendation::Duplicate(existing)) => {
            debug!("POST /fetch_and_process - Returning existing summary");
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Entry already exists. Not storing again.",
                    "summary": existing.summary,
                })),
            )
                .into_response()
        }
        Err(e) => into_error_response(e),
    }
}

fn into_error_response(e: RecommendError) -> Response {
    // ---
    match e {
        RecommendError::NoCity => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        RecommendError::UnknownCity {
            ref city,
            ref available,
        } => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("Weather data for '{}' not found.", city),
                "available_cities": available,
            })),
        )
            .into_response(),
        RecommendError::Model(ref inner) => {
            error!("Language model call failed: {}", inner);
            error_response(StatusCode::BAD_GATEWAY, "Language model error")
        }
        RecommendError::Store(ref inner) => {
            error!("Summaries store failed: {}", inner);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}
