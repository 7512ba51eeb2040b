//! Vigil core: deterministic suspicious-account detection.
//!
//! Accounts are run through a registry of named heuristic rules, verdicts
//! are persisted per account, the number of flagged accounts is cached, and
//! the whole population can be walked in resumable batches.

/// Account identity and the fields rules look at
pub mod account;

/// Protocol payloads shared between the server and its clients
pub mod api_types;

/// Storage ports, in-memory adapters and (with `database`) Postgres/Redis adapters
pub mod database;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Error types
pub mod error;

pub mod evaluator;
pub mod flagged_count;

/// Extension callbacks around verdict changes
pub mod hooks;

pub mod orchestrator;
pub mod registration;

/// Rule registry and built-in heuristics
pub mod rules;

pub mod scan;
pub mod settings;
pub mod validation;
pub mod verdict;

pub use account::{Account, AccountId};
pub use error::{DetectorError, Result};
pub use evaluator::SuspicionEvaluator;
pub use flagged_count::FlaggedCountCache;
pub use hooks::{AutoDeleteOutcome, DetectorHooks, NoopHooks};
pub use orchestrator::{
    AccountCheckOrchestrator, BulkAction, BulkReport, CheckError, CheckOptions, CheckOutcome,
    OverrideMethod,
};
pub use registration::{RegistrationOutcome, SkipReason};
pub use rules::{Predicate, RuleDescriptor, RuleRegistry};
pub use scan::{BatchReport, BatchScanCoordinator, ScanCursor, ScanSummary};
pub use settings::{DetectorSettings, HeuristicConfig, SettingsProvider, SharedSettings};
pub use validation::{FieldKind, FieldReport, FieldValidator};
pub use verdict::{FlagSet, RuleKey, SuspicionVerdict, VerdictStatus};
