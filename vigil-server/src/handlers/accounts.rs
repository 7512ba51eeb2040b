use axum::{Json, extract::State};
use tracing::{info, warn};

use vigil_core::{
    AccountId, RegistrationOutcome,
    api_types::{AccountEventRequest, ApiResponse, RegistrationScheduled, required},
};

use crate::{auth::Caller, infra::app_state::AppState, infra::errors::AppResult};

/// Schedules screening of a new account once its profile had time to settle.
pub async fn account_registered_handler(
    State(state): State<AppState>,
    Json(request): Json<AccountEventRequest>,
) -> AppResult<Json<ApiResponse<RegistrationScheduled>>> {
    let account_id = required(request.account_id, "account_id")?;
    let settings = state.settings.snapshot();
    if !settings.check_at_registration {
        return Ok(Json(ApiResponse::success(RegistrationScheduled {
            account_id,
            scheduled: false,
            delay_secs: 0,
        })));
    }

    let delay = settings.registration_delay();
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match orchestrator.screen_registration(account_id).await {
            Ok(RegistrationOutcome::Checked(outcome)) => {
                info!(account_id = %account_id, flagged = outcome.is_flagged(), "registration screened");
            }
            Ok(RegistrationOutcome::Skipped(reason)) => {
                info!(account_id = %account_id, ?reason, "registration screening skipped");
            }
            Err(err) => {
                warn!(account_id = %account_id, error = %err, "registration screening failed");
            }
        }
    });

    Ok(Json(ApiResponse::success(RegistrationScheduled {
        account_id,
        scheduled: true,
        delay_secs: delay.as_secs(),
    })))
}

pub async fn account_deleted_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<AccountEventRequest>,
) -> AppResult<Json<ApiResponse<AccountId>>> {
    caller.require_operator()?;
    let account_id = required(request.account_id, "account_id")?;
    state.orchestrator.account_deleted(account_id).await?;
    Ok(Json(
        ApiResponse::success(account_id).with_message("verdict removed".to_string()),
    ))
}
