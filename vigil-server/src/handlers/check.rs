use axum::{Json, extract::State};

use vigil_core::{
    CheckOptions,
    api_types::{ApiResponse, CheckRequest, CheckResponse, OverrideRequest, required},
};

use crate::{auth::Caller, infra::app_state::AppState, infra::errors::AppResult};

/// Checks one account. `single` forces a fresh evaluation; `existing_only`
/// reports the stored verdict without evaluating.
pub async fn check_account_handler(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> AppResult<Json<ApiResponse<CheckResponse>>> {
    let account_id = required(request.account_id, "account_id")?;
    let options = if request.existing_only {
        CheckOptions::existing_only()
    } else if request.single {
        CheckOptions::forced()
    } else {
        CheckOptions::full()
    };

    let outcome = state.orchestrator.check(account_id, options).await?;
    let response =
        CheckResponse::from_outcome(&outcome, state.orchestrator.registry());
    Ok(Json(ApiResponse::success(response)))
}

pub async fn override_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<OverrideRequest>,
) -> AppResult<Json<ApiResponse<CheckResponse>>> {
    caller.require_operator()?;
    let account_id = required(request.account_id, "account_id")?;
    let method = required(request.method, "method")?;

    let outcome = state.orchestrator.apply_override(account_id, method).await?;
    let response =
        CheckResponse::from_outcome(&outcome, state.orchestrator.registry());
    Ok(Json(ApiResponse::success(response)))
}
