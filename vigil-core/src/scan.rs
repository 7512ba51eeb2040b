//! Resumable full-population scan, one page per call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::account::AccountId;
use crate::database::ports::accounts::AccountDirectory;
use crate::error::Result;
use crate::orchestrator::{AccountCheckOrchestrator, CheckOptions, CheckOutcome};

pub const MIN_PAGE_SIZE: usize = 1;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Position in the ascending-id walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCursor {
    /// Last processed id; `0` before the first batch.
    pub last_id: AccountId,
    pub page_size: usize,
}

impl ScanCursor {
    /// Page size is clamped to `1..=1000`.
    pub fn new(last_id: AccountId, page_size: usize) -> Self {
        Self {
            last_id,
            page_size: page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
        }
    }

    pub fn start(page_size: usize) -> Self {
        Self::new(AccountId(0), page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Accounts visited, including those whose check failed.
    pub processed: usize,
    /// Accounts in this batch that came out flagged.
    pub flagged: usize,
    pub next_cursor: ScanCursor,
    pub done: bool,
}

/// Totals of a scan driven to completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub batches: usize,
    pub processed: usize,
    pub flagged: usize,
    pub last_id: AccountId,
}

/// Walks the account population page by page.
///
/// Holds no state between calls: the caller carries the cursor and stops
/// asking for batches to cancel.
#[derive(Clone)]
pub struct BatchScanCoordinator {
    directory: Arc<dyn AccountDirectory>,
    orchestrator: Arc<AccountCheckOrchestrator>,
}

impl fmt::Debug for BatchScanCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScanCoordinator").finish_non_exhaustive()
    }
}

impl BatchScanCoordinator {
    pub fn new(orchestrator: Arc<AccountCheckOrchestrator>) -> Self {
        Self {
            directory: Arc::clone(orchestrator.directory()),
            orchestrator,
        }
    }

    #[instrument(skip(self), fields(last_id = %cursor.last_id, page_size = cursor.page_size))]
    pub async fn run_batch(&self, cursor: ScanCursor) -> Result<BatchReport> {
        let cursor = ScanCursor::new(cursor.last_id, cursor.page_size);

        // One row past the page tells whether anything is left.
        let mut page = self
            .directory
            .list_accounts_page(cursor.last_id, cursor.page_size + 1)
            .await?;
        let done = page.len() <= cursor.page_size;
        page.truncate(cursor.page_size);

        let mut flagged = 0;
        for account in &page {
            match self
                .orchestrator
                .check_account(account, CheckOptions::full())
                .await
            {
                Ok(CheckOutcome::Flagged(_)) => flagged += 1,
                Ok(_) => {}
                Err(err) => {
                    warn!(account_id = %account.id, error = %err, "check failed during scan");
                }
            }
        }

        let last_id = page.last().map_or(cursor.last_id, |account| account.id);
        Ok(BatchReport {
            processed: page.len(),
            flagged,
            next_cursor: ScanCursor::new(last_id, cursor.page_size),
            done,
        })
    }

    /// Drives batches until the population is exhausted.
    pub async fn run_to_completion(&self, page_size: usize) -> Result<ScanSummary> {
        let mut cursor = ScanCursor::start(page_size);
        let mut summary = ScanSummary::default();
        loop {
            let report = self.run_batch(cursor).await?;
            summary.batches += 1;
            summary.processed += report.processed;
            summary.flagged += report.flagged;
            summary.last_id = report.next_cursor.last_id;
            info!(
                batch = summary.batches,
                processed = summary.processed,
                flagged = summary.flagged,
                "scan progress"
            );
            if report.done {
                return Ok(summary);
            }
            cursor = report.next_cursor;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use super::*;
    use crate::account::Account;
    use crate::database::infrastructure::memory::{
        InMemoryAccountDirectory, InMemoryCountCache, InMemoryVerdictRepository,
    };
    use crate::database::ports::verdicts::{MockVerdictRepository, VerdictRepository};
    use crate::error::DetectorError;
    use crate::flagged_count::FlaggedCountCache;
    use crate::rules::RuleRegistry;
    use crate::settings::{DetectorSettings, HeuristicConfig};
    use crate::verdict::SuspicionVerdict;

    fn population(n: i64) -> Vec<Account> {
        (1..=n)
            .map(|id| {
                let account = Account::new(id, format!("user{id}"), format!("user{id}@example.com"));
                if id % 5 == 0 {
                    account.with_names("SPAMMER99", "", "")
                } else {
                    account.with_names("Jane Doe", "Jane", "Doe")
                }
            })
            .collect()
    }

    fn coordinator_over(
        accounts: Vec<Account>,
        verdicts: Arc<dyn VerdictRepository>,
    ) -> BatchScanCoordinator {
        let directory = Arc::new(InMemoryAccountDirectory::with_accounts(accounts));
        let flagged_count = FlaggedCountCache::new(
            verdicts.clone(),
            Arc::new(InMemoryCountCache::new()),
            Duration::from_secs(60),
        );
        let orchestrator = AccountCheckOrchestrator::new(
            directory,
            verdicts,
            Arc::new(RuleRegistry::with_builtins(&HeuristicConfig::default())),
            Arc::new(DetectorSettings::default()),
            flagged_count,
        );
        BatchScanCoordinator::new(Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn twenty_five_accounts_in_pages_of_ten() {
        let coordinator =
            coordinator_over(population(25), Arc::new(InMemoryVerdictRepository::new()));
        let mut cursor = ScanCursor::start(10);
        let mut dones = Vec::new();
        let mut processed = 0;
        let mut flagged = 0;
        loop {
            let report = coordinator.run_batch(cursor).await.unwrap();
            dones.push(report.done);
            processed += report.processed;
            flagged += report.flagged;
            cursor = report.next_cursor;
            if report.done {
                break;
            }
        }
        assert_eq!(dones, vec![false, false, true]);
        assert_eq!(processed, 25);
        assert_eq!(flagged, 5);
        assert_eq!(cursor.last_id, AccountId(25));
    }

    #[tokio::test]
    async fn exact_multiple_finishes_without_empty_batch() {
        for (n, page) in [(20, 10), (1, 1), (7, 3), (0, 4)] {
            let coordinator =
                coordinator_over(population(n), Arc::new(InMemoryVerdictRepository::new()));
            let summary = coordinator.run_to_completion(page).await.unwrap();
            let expected_batches = ((n as usize).div_ceil(page)).max(1);
            assert_eq!(summary.batches, expected_batches, "n={n} page={page}");
            assert_eq!(summary.processed, n as usize);
        }
    }

    #[tokio::test]
    async fn every_account_visited_once() {
        let verdicts = Arc::new(InMemoryVerdictRepository::new());
        let coordinator = coordinator_over(population(13), verdicts.clone());
        coordinator.run_to_completion(4).await.unwrap();

        let mut seen = BTreeSet::new();
        for id in 1..=13 {
            let verdict = verdicts.get_verdict(AccountId(id)).await.unwrap();
            assert_ne!(verdict, SuspicionVerdict::NotChecked);
            seen.insert(id);
        }
        assert_eq!(seen.len(), 13);
    }

    #[tokio::test]
    async fn per_account_failures_still_count_as_processed() {
        let mut verdicts = MockVerdictRepository::new();
        verdicts
            .expect_get_verdict()
            .returning(|_| Err(DetectorError::Storage("timeout".into())));
        let coordinator = coordinator_over(population(3), Arc::new(verdicts));

        let report = coordinator.run_batch(ScanCursor::start(10)).await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.flagged, 0);
        assert!(report.done);
        assert_eq!(report.next_cursor.last_id, AccountId(3));
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(ScanCursor::start(0).page_size, 1);
        assert_eq!(ScanCursor::start(5000).page_size, 1000);
        assert_eq!(ScanCursor::start(50).page_size, 50);
    }
}
