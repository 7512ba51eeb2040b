use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::Result;
use crate::verdict::{SuspicionVerdict, VerdictStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub account_id: AccountId,
    pub verdict: SuspicionVerdict,
    pub updated_at: DateTime<Utc>,
}

/// Persistence of the last verdict per account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerdictRepository: Send + Sync {
    /// `NotChecked` when nothing is stored.
    async fn get_verdict(&self, id: AccountId) -> Result<SuspicionVerdict>;

    /// Storing `NotChecked` removes the record.
    async fn set_verdict(&self, id: AccountId, verdict: &SuspicionVerdict) -> Result<()>;

    /// Returns `false` when nothing was stored.
    async fn delete_verdict(&self, id: AccountId) -> Result<bool>;

    async fn count_flagged(&self) -> Result<u64>;

    /// Stored records with the given status and an id greater than `after`,
    /// ascending. `NotChecked` is never stored and yields nothing.
    async fn list_by_status(
        &self,
        status: VerdictStatus,
        after: AccountId,
        limit: usize,
    ) -> Result<Vec<VerdictRecord>>;

    /// Removes every stored verdict and returns how many were removed.
    async fn purge_all(&self) -> Result<u64>;
}
