//! Extension points around verdict changes.

use std::fmt;

use crate::account::{Account, AccountId};
use crate::verdict::FlagSet;

/// Result of an automatic removal attempt, handed to
/// [`DetectorHooks::after_auto_delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoDeleteOutcome {
    Deleted,
    /// A hook vetoed the removal.
    Vetoed,
    /// The directory no longer had the account.
    Missing,
    Failed(String),
}

/// Callbacks invoked by the orchestrator. Every method has a no-op default,
/// so implementors override only what they need.
pub trait DetectorHooks: Send + Sync {
    fn on_flagged(&self, _account: &Account, _flags: &FlagSet) {}

    fn on_cleared(&self, _account: &Account) {}

    fn before_auto_delete(&self, _account: &Account, _flags: &FlagSet) {}

    /// Returning `false` keeps the account.
    fn approve_auto_delete(&self, _account: &Account, _flags: &FlagSet) -> bool {
        true
    }

    fn after_auto_delete(&self, _account_id: AccountId, _outcome: &AutoDeleteOutcome) {}

    /// Formats the line emitted when flag logging is on.
    fn format_flag_log(&self, account: &Account, flags: &FlagSet) -> String {
        format!(
            "User flagged - {} - {} (ID - {})",
            flags.to_strings().join(", "),
            account.display_name,
            account.id
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl DetectorHooks for NoopHooks {}

impl fmt::Debug for dyn DetectorHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DetectorHooks")
    }
}
