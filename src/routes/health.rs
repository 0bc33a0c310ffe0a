// src/routes/health.rs
//! Health check endpoint for the event clustering service.
//!
//! `/health` is used by container orchestrators and CI pipelines. Besides
//! answering at all, it pings the database, since neither clustering mode can
//! do anything useful without it. Follows EMBP: the handler stays private and
//! only the subrouter is exported to the gateway.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::{Config, PgStore};

/// JSON response body for the `/health` endpoint.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

fn health_response(database_ok: bool) -> (StatusCode, HealthResponse) {
    // ---
    if database_ok {
        (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                database: "ok",
            },
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "degraded",
                database: "unavailable",
            },
        )
    }
}

/// Handle `GET /health`.
async fn health(State((store, _)): State<(PgStore, Config)>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    let database_ok = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check database ping failed: {:#}", e);
            false
        }
    };
    let (status, body) = health_response(database_ok);
    (status, Json(body))
}

pub fn router() -> Router<(PgStore, Config)> {
    Router::new().route("/health", get(health))
}
