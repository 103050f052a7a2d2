//! Axum route handlers for the survey data HTTP API.

use crate::error::GatewayError;
use crate::gateway::{Gateway, RecordSet};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use survey_data_types::*;

pub struct AppState {
    pub gateway: Gateway,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(state: Arc<AppState>) -> Router {
    let cors = tower_http::cors::CorsLayer::permissive();

    Router::new()
        .route("/api/data", get(list_data).post(query_data))
        .route("/api/seed", post(seed))
        .with_state(state)
        .layer(cors)
}

fn error_response(err: GatewayError, generic: &str) -> ApiError {
    match err {
        GatewayError::ValidationFailure { .. } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(err.to_string())),
        ),
        GatewayError::StoreFailure { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(generic)),
        ),
    }
}

fn data_response(set: RecordSet) -> Json<DataResponse> {
    Json(DataResponse {
        success: true,
        count: set.count,
        data: set.records,
    })
}

// GET /api/data
pub async fn list_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse>, ApiError> {
    match state.gateway.list_all() {
        Ok(set) => Ok(data_response(set)),
        Err(e) => {
            log::error!("Error fetching data: {}", e);
            Err(error_response(e, "Internal server error"))
        }
    }
}

// POST /api/data
pub async fn query_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DataQueryRequest>, JsonRejection>,
) -> Result<Json<DataResponse>, ApiError> {
    // No body, or a non-JSON one, means no filters. A JSON body that does not
    // parse is rejected rather than widened to every record.
    let filters = match body {
        Ok(Json(req)) => req.filters.unwrap_or_default(),
        Err(JsonRejection::MissingJsonContentType(_)) => RecordFilter::default(),
        Err(rejection) => {
            log::warn!("Rejected data query body: {}", rejection.body_text());
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!(
                    "Invalid request body: {}",
                    rejection.body_text()
                ))),
            ));
        }
    };
    match state.gateway.list_filtered(&filters) {
        Ok(set) => Ok(data_response(set)),
        Err(e) => {
            log::error!("Error fetching filtered data: {}", e);
            Err(error_response(e, "Internal server error"))
        }
    }
}

// POST /api/seed
pub async fn seed(State(state): State<Arc<AppState>>) -> Result<Json<SeedResponse>, ApiError> {
    match state.gateway.reseed() {
        Ok(_) => Ok(Json(SeedResponse::ok("Database seeded successfully"))),
        Err(e) => {
            log::error!("Error in manual seeding: {}", e);
            Err(error_response(e, "Error seeding database"))
        }
    }
}
