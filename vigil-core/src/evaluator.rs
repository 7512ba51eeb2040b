use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::account::Account;
use crate::rules::RuleRegistry;
use crate::verdict::RuleKey;

/// Runs enabled predicates against an account.
#[derive(Clone)]
pub struct SuspicionEvaluator {
    registry: Arc<RuleRegistry>,
}

impl fmt::Debug for SuspicionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspicionEvaluator")
            .field("rules", &self.registry.list_rules().len())
            .finish()
    }
}

impl SuspicionEvaluator {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Returns every enabled key whose predicate fires.
    ///
    /// Every enabled predicate runs, there is no short-circuit. Keys the
    /// registry does not know are skipped.
    pub fn evaluate(&self, account: &Account, enabled: &BTreeSet<RuleKey>) -> BTreeSet<RuleKey> {
        let mut fired = BTreeSet::new();
        for key in enabled {
            let Some(predicate) = self.registry.predicate(key.as_str()) else {
                trace!(rule = %key, "skipping unknown rule");
                continue;
            };
            if predicate.matches(account) {
                fired.insert(key.clone());
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::rules::Predicate;
    use crate::settings::{DetectorSettings, HeuristicConfig};

    fn shouting_account() -> Account {
        Account::new(7, "shouty", "shouty@example.com").with_names("XXXYYY123", "", "")
    }

    #[test]
    fn reports_only_enabled_rules() {
        let evaluator = SuspicionEvaluator::new(Arc::new(RuleRegistry::with_builtins(
            &HeuristicConfig::default(),
        )));
        let enabled = BTreeSet::from([RuleKey::EXCESSIVE_UPPERCASE, RuleKey::NUMBERS]);
        let fired = evaluator.evaluate(&shouting_account(), &enabled);
        assert_eq!(fired, enabled);

        let enabled = BTreeSet::from([RuleKey::EXCESSIVE_UPPERCASE]);
        let fired = evaluator.evaluate(&shouting_account(), &enabled);
        assert_eq!(fired, BTreeSet::from([RuleKey::EXCESSIVE_UPPERCASE]));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let registry = Arc::new(RuleRegistry::with_builtins(&HeuristicConfig::default()));
        let evaluator = SuspicionEvaluator::new(Arc::clone(&registry));
        let enabled = registry.enabled_keys(&DetectorSettings::default());
        let account = Account::new(3, "www.buy-now.com", "a.b.c.d@mailinator.com")
            .with_names("Brzt", "Viagra", "Doe");
        let first = evaluator.evaluate(&account, &enabled);
        for _ in 0..5 {
            assert_eq!(evaluator.evaluate(&account, &enabled), first);
        }
        assert!(first.contains("no_vowels"));
        assert!(first.contains("spam_words"));
        assert!(first.contains("url_in_username"));
        assert!(first.contains("invalid_email_domain"));
        assert!(first.contains("excessive_periods_email"));
        assert!(!first.contains("admin_flag"));
    }

    #[test]
    fn runs_every_enabled_predicate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = RuleRegistry::with_builtins(&HeuristicConfig::default());
        for key in ["probe_a", "probe_b"] {
            let calls = Arc::clone(&calls);
            registry
                .register_custom(
                    key,
                    key,
                    Predicate::account(move |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        true
                    }),
                )
                .unwrap();
        }
        let evaluator = SuspicionEvaluator::new(Arc::new(registry));
        let enabled = BTreeSet::from([
            RuleKey::new("probe_a"),
            RuleKey::new("probe_b"),
            RuleKey::new("not_registered"),
        ]);
        let fired = evaluator.evaluate(&shouting_account(), &enabled);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(fired.len(), 2);
        assert!(!fired.contains("not_registered"));
    }
}
