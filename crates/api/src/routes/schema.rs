//! Serves the OpenAPI document.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::OpenApi;

use crate::openapi::build_openapi;
use crate::state::AppState;

/// GET /schema/ -- the OpenAPI 3 document as JSON.
async fn schema(State(state): State<AppState>) -> Json<OpenApi> {
    Json(build_openapi(&state.config.schema))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/schema/", get(schema))
}
