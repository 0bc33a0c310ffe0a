use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    cancel_bulk_action, BulkActionId, BulkActionRepository, BulkImportPipeline, CancelOutcome,
    Config, HttpRowSource, ImportJob, PgStore, RowValidator,
};

// ---

const ACTION_KEY: &str = "report_import";

pub fn router() -> Router<(PgStore, Config)> {
    // ---
    Router::new()
        .route("/imports", post(start))
        .route("/imports/{id}", get(show))
        .route("/imports/{id}/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartImport {
    file_url: String,
}

/// Handle `POST /imports`: record the action and run it in the background.
async fn start(
    State((store, config)): State<(PgStore, Config)>,
    Json(body): Json<StartImport>,
) -> impl IntoResponse {
    // ---
    info!("POST /imports - {}", body.file_url);

    let source = match HttpRowSource::new(config.import_fetch_timeout) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to prepare import source: {:#}", e);
            return internal_error("Failed to start import");
        }
    };

    let action = match store.create(ACTION_KEY, &body.file_url).await {
        Ok(action) => action,
        Err(e) => {
            error!("Failed to create bulk action: {:#}", e);
            return internal_error("Failed to start import");
        }
    };

    let id = action.id;
    tokio::spawn(async move {
        let pipeline = BulkImportPipeline::new(
            &store,
            &store,
            &store,
            RowValidator::new(config.import_utc_offset),
            config.default_clustering,
        );
        ImportJob::new(&store, &source, pipeline).run(id).await;
    });

    (StatusCode::ACCEPTED, Json(action)).into_response()
}

/// Handle `GET /imports/{id}`.
async fn show(
    State((store, _)): State<(PgStore, Config)>,
    Path(id): Path<BulkActionId>,
) -> impl IntoResponse {
    // ---
    match store.find_by_id(id).await {
        Ok(Some(action)) => (StatusCode::OK, Json(action)).into_response(),
        Ok(None) => not_found(id),
        Err(e) => {
            error!("Failed to load bulk action {}: {:#}", id, e);
            internal_error("Failed to load import")
        }
    }
}

/// Handle `POST /imports/{id}/cancel`.
async fn cancel(
    State((store, _)): State<(PgStore, Config)>,
    Path(id): Path<BulkActionId>,
) -> impl IntoResponse {
    // ---
    info!("POST /imports/{}/cancel", id);

    match cancel_bulk_action(&store, id).await {
        Ok(CancelOutcome::Cancelled(action)) => (StatusCode::OK, Json(action)).into_response(),
        Ok(CancelOutcome::NotFound) => not_found(id),
        Ok(CancelOutcome::NotActive(status)) => {
            let message = format!("import is {} and cannot be cancelled", status.as_str());
            (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
        }
        Err(e) => {
            error!("Failed to cancel bulk action {}: {:#}", id, e);
            internal_error("Failed to cancel import")
        }
    }
}

fn not_found(id: BulkActionId) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("import {} not found", id) })),
    )
        .into_response()
}

fn internal_error(message: &str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}
