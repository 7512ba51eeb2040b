use axum::{Json, extract::State};

use vigil_core::{
    FieldReport,
    api_types::{ApiResponse, ValidateRequest, required},
};

use crate::{infra::app_state::AppState, infra::errors::AppResult};

pub async fn validate_field_handler(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> AppResult<Json<ApiResponse<FieldReport>>> {
    let field = required(request.field, "field")?;
    let values: Vec<&str> = request.values.iter().map(String::as_str).collect();
    let report = state.validator.validate(field, &values);
    Ok(Json(ApiResponse::success(report)))
}
