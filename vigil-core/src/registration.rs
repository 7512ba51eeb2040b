//! Deferred screening of freshly registered accounts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::account::AccountId;
use crate::orchestrator::{AccountCheckOrchestrator, CheckOptions, CheckOutcome, CheckResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    /// First, last or display name is missing.
    IncompleteProfile,
    /// The account was removed before screening ran.
    Gone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Skipped(SkipReason),
    Checked(CheckOutcome),
}

impl AccountCheckOrchestrator {
    /// Screens a new account without committing a cleared result, so the
    /// account still shows as unchecked until a full scan reaches it.
    pub async fn screen_registration(&self, id: AccountId) -> CheckResult<RegistrationOutcome> {
        if !self.settings().check_at_registration() {
            return Ok(RegistrationOutcome::Skipped(SkipReason::Disabled));
        }

        let Some(account) = self.directory().get_account(id).await? else {
            debug!(account_id = %id, "registered account vanished before screening");
            return Ok(RegistrationOutcome::Skipped(SkipReason::Gone));
        };
        if !account.has_complete_profile() {
            debug!(account_id = %id, "skipping screening of incomplete profile");
            return Ok(RegistrationOutcome::Skipped(SkipReason::IncompleteProfile));
        }

        let outcome = self
            .check_account(&account, CheckOptions::provisional())
            .await?;
        Ok(RegistrationOutcome::Checked(outcome))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::account::Account;
    use crate::database::infrastructure::memory::{
        InMemoryAccountDirectory, InMemoryCountCache, InMemoryVerdictRepository,
    };
    use crate::database::ports::verdicts::VerdictRepository;
    use crate::flagged_count::FlaggedCountCache;
    use crate::rules::RuleRegistry;
    use crate::settings::{DetectorSettings, HeuristicConfig, SharedSettings};
    use crate::verdict::SuspicionVerdict;

    fn setup(
        accounts: Vec<Account>,
    ) -> (
        AccountCheckOrchestrator,
        Arc<InMemoryVerdictRepository>,
        SharedSettings,
    ) {
        let verdicts = Arc::new(InMemoryVerdictRepository::new());
        let settings = SharedSettings::new(DetectorSettings::default());
        let orchestrator = AccountCheckOrchestrator::new(
            Arc::new(InMemoryAccountDirectory::with_accounts(accounts)),
            verdicts.clone(),
            Arc::new(RuleRegistry::with_builtins(&HeuristicConfig::default())),
            Arc::new(settings.clone()),
            FlaggedCountCache::new(
                verdicts.clone(),
                Arc::new(InMemoryCountCache::new()),
                Duration::from_secs(60),
            ),
        );
        (orchestrator, verdicts, settings)
    }

    #[tokio::test]
    async fn flags_suspicious_registration() {
        let account =
            Account::new(1, "bot", "bot@example.com").with_names("BRZT", "BRZT", "Xqwrtz");
        let (orchestrator, verdicts, _) = setup(vec![account]);
        let outcome = orchestrator.screen_registration(AccountId(1)).await.unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Checked(CheckOutcome::Flagged(_))));
        assert!(verdicts.get_verdict(AccountId(1)).await.unwrap().is_flagged());
    }

    #[tokio::test]
    async fn clean_registration_is_not_committed() {
        let account =
            Account::new(1, "jane", "jane@example.com").with_names("Jane Doe", "Jane", "Doe");
        let (orchestrator, verdicts, _) = setup(vec![account]);
        let outcome = orchestrator.screen_registration(AccountId(1)).await.unwrap();
        assert_eq!(outcome, RegistrationOutcome::Checked(CheckOutcome::Cleared));
        assert_eq!(
            verdicts.get_verdict(AccountId(1)).await.unwrap(),
            SuspicionVerdict::NotChecked
        );
    }

    #[tokio::test]
    async fn skips_incomplete_profiles_and_disabled_setting() {
        let account = Account::new(1, "x", "x@example.com").with_names("X9", "", "");
        let (orchestrator, verdicts, settings) = setup(vec![account]);
        assert_eq!(
            orchestrator.screen_registration(AccountId(1)).await.unwrap(),
            RegistrationOutcome::Skipped(SkipReason::IncompleteProfile)
        );
        assert_eq!(
            orchestrator.screen_registration(AccountId(2)).await.unwrap(),
            RegistrationOutcome::Skipped(SkipReason::Gone)
        );

        settings.update(|s| s.check_at_registration = false);
        assert_eq!(
            orchestrator.screen_registration(AccountId(1)).await.unwrap(),
            RegistrationOutcome::Skipped(SkipReason::Disabled)
        );
        assert_eq!(
            verdicts.get_verdict(AccountId(1)).await.unwrap(),
            SuspicionVerdict::NotChecked
        );
    }
}
