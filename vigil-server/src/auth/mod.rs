use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use constant_time_eq::constant_time_eq;
use tracing::debug;

use vigil_core::api_types::ProtocolError;

use crate::infra::app_state::AppState;

/// Capability of the party making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Operator,
    Anonymous,
}

impl Caller {
    pub fn is_operator(self) -> bool {
        matches!(self, Self::Operator)
    }

    pub fn require_operator(self) -> Result<(), ProtocolError> {
        if self.is_operator() {
            Ok(())
        } else {
            Err(ProtocolError::PermissionDenied)
        }
    }

    /// Resolves the caller from an `Authorization` header value.
    pub fn from_bearer(header: Option<&str>, operator_token: Option<&str>) -> Self {
        let (Some(header), Some(expected)) = (header, operator_token) else {
            return Self::Anonymous;
        };
        let Some(presented) = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
        else {
            return Self::Anonymous;
        };

        if constant_time_eq(presented.trim().as_bytes(), expected.as_bytes()) {
            Self::Operator
        } else {
            debug!("operator token mismatch");
            Self::Anonymous
        }
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        Ok(Self::from_bearer(header, state.operator_token()))
    }
}
