//! Request and response payloads of the detector protocols.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::AccountId;
use crate::orchestrator::{BulkAction, CheckError, CheckOutcome, OverrideMethod};
use crate::rules::RuleRegistry;
use crate::scan::BatchReport;
use crate::validation::FieldKind;
use crate::verdict::{RuleKey, VerdictStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(error),
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

/// Failures surfaced at the protocol boundary, each with a stable reason code.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::MissingParameter(_) => "missing_parameter",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<CheckError> for ProtocolError {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::AccountNotFound(id) => Self::AccountNotFound(id),
            CheckError::Storage(inner) => Self::Internal(inner.to_string()),
        }
    }
}

/// Requires an optional request field.
pub fn required<T>(value: Option<T>, name: &'static str) -> Result<T, ProtocolError> {
    value.ok_or(ProtocolError::MissingParameter(name))
}

// ===== Single check / override =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckRequest {
    pub account_id: Option<AccountId>,
    /// Re-evaluate even when a verdict is stored.
    #[serde(default)]
    pub single: bool,
    /// Report the stored verdict only.
    #[serde(default)]
    pub existing_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub account_id: Option<AccountId>,
    pub method: Option<OverrideMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Cleared,
    NotChecked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEntry {
    pub key: RuleKey,
    pub title: String,
}

/// `"cleared"`, `"not_checked"`, or the fired rules in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckResponse {
    Status(CheckStatus),
    Flags(Vec<FlagEntry>),
}

impl CheckResponse {
    pub fn from_outcome(outcome: &CheckOutcome, registry: &RuleRegistry) -> Self {
        match outcome {
            CheckOutcome::Cleared => Self::Status(CheckStatus::Cleared),
            CheckOutcome::NotEvaluated => Self::Status(CheckStatus::NotChecked),
            CheckOutcome::Flagged(flags) => Self::Flags(
                registry
                    .order_keys(flags)
                    .into_iter()
                    .map(|key| FlagEntry {
                        title: registry.title_for(key.as_str()).unwrap_or(key.as_str()).to_string(),
                        key,
                    })
                    .collect(),
            ),
        }
    }
}

// ===== Scan =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanBatchRequest {
    #[serde(default)]
    pub last_id: AccountId,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanBatchResponse {
    pub processed: usize,
    pub flagged_count: usize,
    pub last_id: AccountId,
    pub done: bool,
}

impl From<BatchReport> for ScanBatchResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            processed: report.processed,
            flagged_count: report.flagged,
            last_id: report.next_cursor.last_id,
            done: report.done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedCountResponse {
    pub count: u64,
}

// ===== Admin =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkRequest {
    pub action: Option<BulkAction>,
    #[serde(default)]
    pub account_ids: Vec<AccountId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerdictListQuery {
    pub status: Option<VerdictStatus>,
    #[serde(default)]
    pub after: AccountId,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub key: RuleKey,
    pub title: String,
    pub builtin: bool,
    pub enabled: bool,
}

// ===== Forms and account lifecycle =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub field: Option<FieldKind>,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountEventRequest {
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationScheduled {
    pub account_id: AccountId,
    pub scheduled: bool,
    pub delay_secs: u64,
}
