use axum::{
    Json,
    extract::{Query, State},
};

use vigil_core::{
    BulkReport, VerdictStatus,
    api_types::{
        ApiResponse, BulkRequest, ProtocolError, RuleInfo, VerdictListQuery, required,
    },
    orchestrator::AccountStatus,
    scan::MAX_PAGE_SIZE,
};

use crate::{auth::Caller, infra::app_state::AppState, infra::errors::AppResult};

const DEFAULT_LIST_LIMIT: usize = 50;

pub async fn bulk_action_handler(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<BulkRequest>,
) -> AppResult<Json<ApiResponse<BulkReport>>> {
    caller.require_operator()?;
    let action = required(request.action, "action")?;
    if request.account_ids.is_empty() {
        return Err(ProtocolError::MissingParameter("account_ids").into());
    }

    let report = state.orchestrator.bulk(action, &request.account_ids).await;
    Ok(Json(ApiResponse::success(report)))
}

/// Pages through accounts by verdict status, flagged first by default.
pub async fn list_verdicts_handler(
    State(state): State<AppState>,
    Query(query): Query<VerdictListQuery>,
) -> AppResult<Json<ApiResponse<Vec<AccountStatus>>>> {
    let status = query.status.unwrap_or(VerdictStatus::Flagged);
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(ProtocolError::InvalidParameter {
            name: "limit",
            reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
        }
        .into());
    }

    let accounts = state
        .orchestrator
        .list_by_status(status, query.after, limit)
        .await?;
    Ok(Json(ApiResponse::success(accounts)))
}

pub async fn list_rules_handler(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<RuleInfo>>> {
    let registry = state.orchestrator.registry();
    let rules = registry
        .list_rules()
        .into_iter()
        .map(|rule| RuleInfo {
            enabled: registry.is_enabled(rule.key.as_str(), &state.settings),
            key: rule.key,
            title: rule.title,
            builtin: rule.builtin,
        })
        .collect();
    Json(ApiResponse::success(rules))
}
