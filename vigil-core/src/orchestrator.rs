//! Per-account state machine: reuse a stored verdict or evaluate, persist,
//! then run the side effects.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::account::{Account, AccountId};
use crate::database::ports::accounts::AccountDirectory;
use crate::database::ports::verdicts::VerdictRepository;
use crate::error::DetectorError;
use crate::evaluator::SuspicionEvaluator;
use crate::flagged_count::FlaggedCountCache;
use crate::hooks::{AutoDeleteOutcome, DetectorHooks, NoopHooks};
use crate::rules::RuleRegistry;
use crate::settings::SettingsProvider;
use crate::verdict::{FlagSet, SuspicionVerdict, VerdictStatus};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error(transparent)]
    Storage(#[from] DetectorError),
}

pub type CheckResult<T> = std::result::Result<T, CheckError>;

/// Knobs for a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Only report stored verdicts; never evaluate.
    pub only_check_existing: bool,
    /// Ignore stored verdicts and evaluate again.
    pub force_recheck: bool,
    /// Persist `Cleared` when nothing fires.
    pub update_when_cleared: bool,
}

impl CheckOptions {
    pub const fn full() -> Self {
        Self {
            only_check_existing: false,
            force_recheck: false,
            update_when_cleared: true,
        }
    }

    pub const fn existing_only() -> Self {
        Self {
            only_check_existing: true,
            ..Self::full()
        }
    }

    pub const fn forced() -> Self {
        Self {
            force_recheck: true,
            ..Self::full()
        }
    }

    /// Evaluates without committing a cleared result, so a later check sees
    /// the account as never checked.
    pub const fn provisional() -> Self {
        Self {
            update_when_cleared: false,
            ..Self::full()
        }
    }
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self::full()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Cleared,
    Flagged(FlagSet),
    /// Existing-only check on an account without a usable stored verdict.
    NotEvaluated,
}

impl CheckOutcome {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMethod {
    Clear,
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    MarkSuspicious,
    MarkNotSuspicious,
    MarkUnchecked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub updated: usize,
    pub failed: Vec<AccountId>,
}

/// Account with its current verdict, as listed by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub account_id: AccountId,
    pub verdict: SuspicionVerdict,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct AccountCheckOrchestrator {
    directory: Arc<dyn AccountDirectory>,
    verdicts: Arc<dyn VerdictRepository>,
    evaluator: SuspicionEvaluator,
    settings: Arc<dyn SettingsProvider>,
    flagged_count: FlaggedCountCache,
    hooks: Arc<dyn DetectorHooks>,
}

impl fmt::Debug for AccountCheckOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCheckOrchestrator")
            .field("evaluator", &self.evaluator)
            .field("flagged_count", &self.flagged_count)
            .finish_non_exhaustive()
    }
}

impl AccountCheckOrchestrator {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        verdicts: Arc<dyn VerdictRepository>,
        registry: Arc<RuleRegistry>,
        settings: Arc<dyn SettingsProvider>,
        flagged_count: FlaggedCountCache,
    ) -> Self {
        Self {
            directory,
            verdicts,
            evaluator: SuspicionEvaluator::new(registry),
            settings,
            flagged_count,
            hooks: Arc::new(NoopHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn DetectorHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        self.evaluator.registry()
    }

    pub fn settings(&self) -> &Arc<dyn SettingsProvider> {
        &self.settings
    }

    pub fn directory(&self) -> &Arc<dyn AccountDirectory> {
        &self.directory
    }

    pub fn flagged_count(&self) -> &FlaggedCountCache {
        &self.flagged_count
    }

    /// Checks an account by id, loading it from the directory only when an
    /// evaluation is needed.
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn check(&self, id: AccountId, options: CheckOptions) -> CheckResult<CheckOutcome> {
        let stored = self.verdicts.get_verdict(id).await?;
        if let Some(outcome) = self.reuse_stored(&stored, options) {
            debug!(?outcome, "reusing stored verdict");
            return Ok(outcome);
        }
        if options.only_check_existing {
            return Ok(CheckOutcome::NotEvaluated);
        }

        let account = self
            .directory
            .get_account(id)
            .await?
            .ok_or(CheckError::AccountNotFound(id))?;

        self.evaluate_and_record(&account, options).await
    }

    /// Same as [`check`](Self::check) for an account the caller already holds.
    pub async fn check_account(
        &self,
        account: &Account,
        options: CheckOptions,
    ) -> CheckResult<CheckOutcome> {
        let stored = self.verdicts.get_verdict(account.id).await?;
        if let Some(outcome) = self.reuse_stored(&stored, options) {
            return Ok(outcome);
        }
        if options.only_check_existing {
            return Ok(CheckOutcome::NotEvaluated);
        }

        self.evaluate_and_record(account, options).await
    }

    /// Stored flags are filtered by the current toggles without rewriting
    /// storage.
    fn reuse_stored(&self, stored: &SuspicionVerdict, options: CheckOptions) -> Option<CheckOutcome> {
        if options.force_recheck {
            return None;
        }
        match stored {
            SuspicionVerdict::Cleared if !self.settings.recheck_cleared() => {
                Some(CheckOutcome::Cleared)
            }
            SuspicionVerdict::Flagged(flags) => {
                let enabled = self.registry().enabled_keys(self.settings.as_ref());
                Some(match flags.retain_enabled(&enabled) {
                    Some(active) => CheckOutcome::Flagged(active),
                    None => CheckOutcome::Cleared,
                })
            }
            _ => None,
        }
    }

    async fn evaluate_and_record(
        &self,
        account: &Account,
        options: CheckOptions,
    ) -> CheckResult<CheckOutcome> {
        let enabled = self.registry().enabled_keys(self.settings.as_ref());
        let fired = self.evaluator.evaluate(account, &enabled);

        let Some(flags) = FlagSet::new(fired) else {
            if options.update_when_cleared {
                self.write_verdict(account.id, &SuspicionVerdict::Cleared).await?;
            }
            debug!(account_id = %account.id, "account cleared");
            self.hooks.on_cleared(account);
            return Ok(CheckOutcome::Cleared);
        };

        self.write_verdict(account.id, &SuspicionVerdict::Flagged(flags.clone()))
            .await?;

        if self.settings.log_flags() {
            let line = self.hooks.format_flag_log(account, &flags);
            warn!(target: "vigil::flags", account_id = %account.id, "{line}");
        }
        if self.settings.auto_delete() {
            self.auto_delete(account, &flags).await;
        }
        self.hooks.on_flagged(account, &flags);

        Ok(CheckOutcome::Flagged(flags))
    }

    async fn auto_delete(&self, account: &Account, flags: &FlagSet) {
        self.hooks.before_auto_delete(account, flags);

        let outcome = if !self.hooks.approve_auto_delete(account, flags) {
            AutoDeleteOutcome::Vetoed
        } else {
            match self.directory.delete_account(account.id).await {
                Ok(true) => {
                    self.forget(account.id).await;
                    AutoDeleteOutcome::Deleted
                }
                Ok(false) => AutoDeleteOutcome::Missing,
                Err(err) => AutoDeleteOutcome::Failed(err.to_string()),
            }
        };

        match &outcome {
            AutoDeleteOutcome::Deleted => {
                info!(account_id = %account.id, "suspicious account removed")
            }
            AutoDeleteOutcome::Vetoed => {
                debug!(account_id = %account.id, "automatic removal vetoed")
            }
            AutoDeleteOutcome::Missing => {
                debug!(account_id = %account.id, "account already gone")
            }
            AutoDeleteOutcome::Failed(reason) => {
                error!(account_id = %account.id, %reason, "automatic removal failed")
            }
        }
        self.hooks.after_auto_delete(account.id, &outcome);
    }

    /// Drops the verdict of an account that no longer exists. Failures are
    /// only logged.
    async fn forget(&self, id: AccountId) {
        match self.verdicts.delete_verdict(id).await {
            Ok(_) => self.invalidate_count().await,
            Err(err) => warn!(account_id = %id, error = %err, "failed to drop verdict"),
        }
    }

    async fn write_verdict(
        &self,
        id: AccountId,
        verdict: &SuspicionVerdict,
    ) -> Result<(), DetectorError> {
        self.verdicts.set_verdict(id, verdict).await?;
        self.invalidate_count().await;
        Ok(())
    }

    async fn invalidate_count(&self) {
        if let Err(err) = self.flagged_count.invalidate().await {
            error!(error = %err, "failed to invalidate flagged count");
        }
    }

    /// Operator override: flag with `admin_flag`, bypassing evaluation.
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn mark_flagged(&self, id: AccountId) -> CheckResult<CheckOutcome> {
        self.require_account(id).await?;
        let flags = FlagSet::admin();
        self.write_verdict(id, &SuspicionVerdict::Flagged(flags.clone()))
            .await?;
        info!("account manually flagged");
        Ok(CheckOutcome::Flagged(flags))
    }

    /// Operator override: clear, bypassing evaluation.
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn mark_cleared(&self, id: AccountId) -> CheckResult<CheckOutcome> {
        self.require_account(id).await?;
        self.write_verdict(id, &SuspicionVerdict::Cleared).await?;
        info!("account manually cleared");
        Ok(CheckOutcome::Cleared)
    }

    /// Forgets the stored verdict so the next check evaluates again.
    pub async fn mark_unchecked(&self, id: AccountId) -> CheckResult<()> {
        self.require_account(id).await?;
        if self.verdicts.delete_verdict(id).await? {
            self.invalidate_count().await;
        }
        Ok(())
    }

    pub async fn apply_override(
        &self,
        id: AccountId,
        method: OverrideMethod,
    ) -> CheckResult<CheckOutcome> {
        match method {
            OverrideMethod::Flag => self.mark_flagged(id).await,
            OverrideMethod::Clear => self.mark_cleared(id).await,
        }
    }

    /// Applies an action to many accounts. Failures are collected rather
    /// than aborting the run.
    pub async fn bulk(&self, action: BulkAction, ids: &[AccountId]) -> BulkReport {
        let mut report = BulkReport::default();
        for &id in ids {
            let result = match action {
                BulkAction::MarkSuspicious => self.mark_flagged(id).await.map(drop),
                BulkAction::MarkNotSuspicious => self.mark_cleared(id).await.map(drop),
                BulkAction::MarkUnchecked => self.mark_unchecked(id).await,
            };
            match result {
                Ok(()) => report.updated += 1,
                Err(err) => {
                    warn!(account_id = %id, ?action, error = %err, "bulk action failed");
                    report.failed.push(id);
                }
            }
        }
        info!(?action, updated = report.updated, failed = report.failed.len(), "bulk action applied");
        report
    }

    /// Drops the verdict of an account removed outside the detector.
    pub async fn account_deleted(&self, id: AccountId) -> CheckResult<()> {
        self.verdicts.delete_verdict(id).await?;
        self.invalidate_count().await;
        Ok(())
    }

    /// Removes every stored verdict.
    pub async fn purge_verdicts(&self) -> CheckResult<u64> {
        let removed = self.verdicts.purge_all().await?;
        self.invalidate_count().await;
        warn!(removed, "purged stored verdicts");
        Ok(removed)
    }

    /// Pages through accounts with the given status, ascending by id.
    ///
    /// `NotChecked` accounts have no stored record, so they are found by
    /// walking the directory.
    pub async fn list_by_status(
        &self,
        status: VerdictStatus,
        after: AccountId,
        limit: usize,
    ) -> CheckResult<Vec<AccountStatus>> {
        if status != VerdictStatus::NotChecked {
            let records = self.verdicts.list_by_status(status, after, limit).await?;
            return Ok(records
                .into_iter()
                .map(|record| AccountStatus {
                    account_id: record.account_id,
                    verdict: record.verdict,
                    updated_at: Some(record.updated_at),
                })
                .collect());
        }

        let mut found = Vec::new();
        let mut cursor = after;
        while found.len() < limit {
            let page = self.directory.list_accounts_page(cursor, limit).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.id;
            for account in &page {
                if found.len() == limit {
                    break;
                }
                if self.verdicts.get_verdict(account.id).await? == SuspicionVerdict::NotChecked {
                    found.push(AccountStatus {
                        account_id: account.id,
                        verdict: SuspicionVerdict::NotChecked,
                        updated_at: None,
                    });
                }
            }
            if page.len() < limit {
                break;
            }
        }
        Ok(found)
    }

    async fn require_account(&self, id: AccountId) -> CheckResult<Account> {
        self.directory
            .get_account(id)
            .await?
            .ok_or(CheckError::AccountNotFound(id))
    }
}
