use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use vigil_core::{CheckError, DetectorError, api_types::ProtocolError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    /// Machine-readable code clients branch on.
    pub reason: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(
        status: StatusCode,
        reason: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            reason,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_parameter", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "permission_denied", message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "reason": self.reason,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<ProtocolError> for AppError {
    fn from(err: ProtocolError) -> Self {
        let status = match &err {
            ProtocolError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            ProtocolError::PermissionDenied => StatusCode::FORBIDDEN,
            ProtocolError::MissingParameter(_)
            | ProtocolError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ProtocolError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, err.reason(), err.to_string())
    }
}

impl From<CheckError> for AppError {
    fn from(err: CheckError) -> Self {
        ProtocolError::from(err).into()
    }
}

impl From<DetectorError> for AppError {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::AccountNotFound(id) => {
                ProtocolError::AccountNotFound(id).into()
            }
            DetectorError::InvalidInput(reason) => {
                ProtocolError::InvalidParameter {
                    name: "request",
                    reason,
                }
                .into()
            }
            other => ProtocolError::Internal(other.to_string()).into(),
        }
    }
}
