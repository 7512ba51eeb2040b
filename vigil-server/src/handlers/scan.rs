use axum::{Json, extract::State};

use vigil_core::{
    ScanCursor,
    api_types::{ApiResponse, FlaggedCountResponse, ScanBatchRequest, ScanBatchResponse},
};

use crate::{infra::app_state::AppState, infra::errors::AppResult};

/// Runs one scan batch after `last_id`. Clients loop until `done`.
pub async fn scan_batch_handler(
    State(state): State<AppState>,
    Json(request): Json<ScanBatchRequest>,
) -> AppResult<Json<ApiResponse<ScanBatchResponse>>> {
    let batch_size = request
        .batch_size
        .unwrap_or_else(|| state.settings.snapshot().scan_batch_size);
    let report = state
        .scanner
        .run_batch(ScanCursor::new(request.last_id, batch_size))
        .await?;
    Ok(Json(ApiResponse::success(report.into())))
}

pub async fn flagged_count_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<FlaggedCountResponse>>> {
    let count = state.orchestrator.flagged_count().count().await?;
    Ok(Json(ApiResponse::success(FlaggedCountResponse { count })))
}
