use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    ClusteringResult, Config, PgStore, RawReportRow, ReportId, ReportRegistration, RowValidator,
};

// ---

pub fn router() -> Router<(PgStore, Config)> {
    // ---
    Router::new().route("/reports", post(handler))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedReport {
    // ---
    id: ReportId,
    has_only_date: bool,
    /// Absent when clustering failed; the report is stored regardless.
    clustering: Option<ClusteringResult>,
}

/// Handle `POST /reports`: validate one row, store it, cluster it online.
async fn handler(
    State((store, config)): State<(PgStore, Config)>,
    Json(row): Json<RawReportRow>,
) -> impl IntoResponse {
    // ---
    info!("POST /reports");

    let validator = RowValidator::new(config.import_utc_offset);
    let report = match validator.validate_row(&row) {
        Ok(report) => report,
        Err(message) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message })),
            )
                .into_response();
        }
    };

    let registration = ReportRegistration::new(&store, &store, &store, config.default_clustering);
    match registration.register(report).await {
        Ok(done) => {
            let body = CreatedReport {
                id: done.report.id,
                has_only_date: done.report.has_only_date,
                clustering: done.clustering,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => {
            error!("Failed to register report: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to register report" })),
            )
                .into_response()
        }
    }
}
