//! Liveness probe mounted at `/health`, outside the versioned API.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// `ok`, or `degraded` when the database probe fails.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub db_latency_ms: u128,
}

/// 200 when the database answers, 503 otherwise. The body has the same shape
/// in both cases.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let started = Instant::now();
    let probe = authapi_db::health_check(&state.pool).await;
    let db_latency_ms = started.elapsed().as_millis();

    if let Err(e) = &probe {
        tracing::warn!(error = %e, "Health check: database unreachable");
    }
    let db_healthy = probe.is_ok();
    let (code, status) = if db_healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthStatus {
            status,
            version: env!("CARGO_PKG_VERSION"),
            db_healthy,
            db_latency_ms,
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
