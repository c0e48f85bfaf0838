//! HTTP request handlers for report endpoints.

use axum::Json;
use serde_json::Value;
use tracing::{debug, error};

use crate::reports::Report;
use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Run one report against the shared dataset.
///
/// Computation and chart rendering are CPU-bound, so they run on the
/// blocking pool instead of an async worker.
pub async fn serve_report(
    state: AppState,
    report: &'static Report,
) -> Result<Json<Value>, ApiError> {
    debug!(report = report.name, path = report.path, "Computing report");

    let dataset = state.dataset.clone();
    let result = tokio::task::spawn_blocking(move || (report.run)(&dataset))
        .await
        .map_err(|e| {
            error!(report = report.name, error = %e, "Report task failed");
            ApiError::Internal(format!("Report task failed: {}", e))
        })?;

    match result {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            error!(report = report.name, error = %e, "Report computation failed");
            Err(ApiError::from(e))
        }
    }
}
