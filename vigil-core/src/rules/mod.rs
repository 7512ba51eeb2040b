//! Rule registry: named predicates, their titles and the enabled set.

pub mod builtin;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::error::{DetectorError, Result};
use crate::settings::{HeuristicConfig, SettingsProvider};
use crate::verdict::{FlagSet, RuleKey};

pub type FieldPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type AccountPredicate = Arc<dyn Fn(&Account) -> bool + Send + Sync>;

/// What a rule looks at.
///
/// Name-scoped predicates run against each non-empty name field and fire when
/// any of them trips.
#[derive(Clone)]
pub enum Predicate {
    Names(FieldPredicate),
    Email(FieldPredicate),
    Username(FieldPredicate),
    Account(AccountPredicate),
    /// Set only by an operator; never fires during evaluation.
    Manual,
}

impl Predicate {
    pub fn names(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Names(Arc::new(f))
    }

    pub fn email(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Email(Arc::new(f))
    }

    pub fn username(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Username(Arc::new(f))
    }

    pub fn account(f: impl Fn(&Account) -> bool + Send + Sync + 'static) -> Self {
        Self::Account(Arc::new(f))
    }

    pub fn matches(&self, account: &Account) -> bool {
        match self {
            Self::Names(predicate) => account.names().any(|name| predicate(name)),
            Self::Email(predicate) => predicate(&account.email),
            Self::Username(predicate) => predicate(&account.username),
            Self::Account(predicate) => predicate(account),
            Self::Manual => false,
        }
    }

    /// Runs a field-scoped predicate against a lone value. `None` for
    /// predicates that need a whole account.
    pub fn test_value(&self, value: &str) -> Option<bool> {
        match self {
            Self::Names(predicate) | Self::Email(predicate) | Self::Username(predicate) => {
                Some(predicate(value))
            }
            Self::Account(_) | Self::Manual => None,
        }
    }

    fn scope(&self) -> &'static str {
        match self {
            Self::Names(_) => "names",
            Self::Email(_) => "email",
            Self::Username(_) => "username",
            Self::Account(_) => "account",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.scope()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub key: RuleKey,
    pub title: String,
    pub builtin: bool,
}

#[derive(Debug, Clone)]
struct Rule {
    descriptor: RuleDescriptor,
    predicate: Predicate,
}

/// Registry of built-in and extension rules.
///
/// Built-ins are resolved before extensions, and the display order is
/// built-ins in declaration order followed by extensions in registration
/// order.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    builtin: HashMap<RuleKey, Rule>,
    custom: HashMap<RuleKey, Rule>,
    order: Vec<RuleKey>,
}

impl RuleRegistry {
    /// Registry without any rule, not even `admin_flag`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins(config: &HeuristicConfig) -> Self {
        let config = Arc::new(config.clone());
        let mut registry = Self::empty();

        let c = Arc::clone(&config);
        registry.add_builtin(
            RuleKey::EXCESSIVE_UPPERCASE,
            "Excessive Uppercase",
            Predicate::names(move |v| builtin::excessive_uppercase(v, &c)),
        );
        registry.add_builtin(
            RuleKey::NO_VOWELS,
            "No Vowels",
            Predicate::names(builtin::no_vowels),
        );
        let c = Arc::clone(&config);
        registry.add_builtin(
            RuleKey::CONSONANT_CLUSTER,
            "Consonant Cluster",
            Predicate::names(move |v| builtin::consonant_cluster(v, &c)),
        );
        registry.add_builtin(
            RuleKey::NUMBERS,
            "Contains Numbers",
            Predicate::names(builtin::numbers),
        );
        let c = Arc::clone(&config);
        registry.add_builtin(
            RuleKey::SPECIAL_CHARACTERS,
            "Special Characters",
            Predicate::names(move |v| builtin::special_characters(v, &c)),
        );
        let c = Arc::clone(&config);
        registry.add_builtin(
            RuleKey::SPAM_WORDS,
            "Spam Words",
            Predicate::names(move |v| builtin::spam_words(v, &c)),
        );
        let c = Arc::clone(&config);
        registry.add_builtin(
            RuleKey::INVALID_EMAIL_DOMAIN,
            "Invalid Email Domain",
            Predicate::email(move |v| builtin::invalid_email_domain(v, &c)),
        );
        let c = Arc::clone(&config);
        registry.add_builtin(
            RuleKey::EXCESSIVE_PERIODS_EMAIL,
            "Excessive Periods in Email",
            Predicate::email(move |v| builtin::excessive_periods_email(v, &c)),
        );
        registry.add_builtin(
            RuleKey::URL_IN_USERNAME,
            "URL in Username",
            Predicate::username(builtin::url_in_username),
        );
        registry.add_builtin(RuleKey::ADMIN_FLAG, "Manually Flagged", Predicate::Manual);

        registry
    }

    fn add_builtin(&mut self, key: RuleKey, title: &str, predicate: Predicate) {
        self.order.push(key.clone());
        self.builtin.insert(
            key.clone(),
            Rule {
                descriptor: RuleDescriptor {
                    key,
                    title: title.to_string(),
                    builtin: true,
                },
                predicate,
            },
        );
    }

    /// Adds an extension rule. Keys must be unique across built-ins and
    /// extensions.
    pub fn register_custom(
        &mut self,
        key: impl Into<RuleKey>,
        title: impl Into<String>,
        predicate: Predicate,
    ) -> Result<()> {
        let key = key.into();
        if key.as_str().trim().is_empty() {
            return Err(DetectorError::InvalidInput("rule key must not be empty".into()));
        }
        if self.contains(key.as_str()) {
            return Err(DetectorError::InvalidInput(format!(
                "rule '{key}' is already registered"
            )));
        }
        self.order.push(key.clone());
        self.custom.insert(
            key.clone(),
            Rule {
                descriptor: RuleDescriptor {
                    key,
                    title: title.into(),
                    builtin: false,
                },
                predicate,
            },
        );
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.builtin.contains_key(key) || self.custom.contains_key(key)
    }

    /// Rules in display order.
    pub fn list_rules(&self) -> Vec<RuleDescriptor> {
        self.order
            .iter()
            .filter_map(|key| self.rule(key.as_str()))
            .map(|rule| rule.descriptor.clone())
            .collect()
    }

    /// Keys whose toggle is on or unset. `admin_flag` is always included.
    pub fn enabled_keys(&self, settings: &dyn SettingsProvider) -> BTreeSet<RuleKey> {
        let mut enabled: BTreeSet<RuleKey> = self
            .order
            .iter()
            .filter(|key| settings.rule_toggle(key.as_str()).unwrap_or(true))
            .cloned()
            .collect();
        enabled.insert(RuleKey::ADMIN_FLAG);
        enabled
    }

    pub fn is_enabled(&self, key: &str, settings: &dyn SettingsProvider) -> bool {
        key == RuleKey::ADMIN_FLAG.as_str() || settings.rule_toggle(key).unwrap_or(true)
    }

    /// Built-in predicate first, then extension.
    pub fn predicate(&self, key: &str) -> Option<&Predicate> {
        self.rule(key).map(|rule| &rule.predicate)
    }

    pub fn title_for(&self, key: &str) -> Option<&str> {
        self.rule(key).map(|rule| rule.descriptor.title.as_str())
    }

    /// Flags in display order; keys unknown to the registry go last.
    pub fn order_keys(&self, flags: &FlagSet) -> Vec<RuleKey> {
        let mut ordered: Vec<RuleKey> = self
            .order
            .iter()
            .filter(|key| flags.contains(key.as_str()))
            .cloned()
            .collect();
        ordered.extend(flags.iter().filter(|key| !self.contains(key.as_str())).cloned());
        ordered
    }

    fn rule(&self, key: &str) -> Option<&Rule> {
        self.builtin.get(key).or_else(|| self.custom.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DetectorSettings;

    fn registry() -> RuleRegistry {
        RuleRegistry::with_builtins(&HeuristicConfig::default())
    }

    #[test]
    fn builtins_listed_in_declaration_order() {
        let keys: Vec<String> = registry()
            .list_rules()
            .into_iter()
            .map(|rule| rule.key.to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                "excessive_uppercase",
                "no_vowels",
                "consonant_cluster",
                "numbers",
                "special_characters",
                "spam_words",
                "invalid_email_domain",
                "excessive_periods_email",
                "url_in_username",
                "admin_flag",
            ]
        );
    }

    #[test]
    fn custom_rules_follow_builtins() {
        let mut registry = registry();
        registry
            .register_custom("short_username", "Short Username", Predicate::username(|v| v.len() < 3))
            .unwrap();
        let last = registry.list_rules().pop().unwrap();
        assert_eq!(last.key.as_str(), "short_username");
        assert!(!last.builtin);
        assert_eq!(registry.title_for("short_username"), Some("Short Username"));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut registry = registry();
        let err = registry
            .register_custom("numbers", "Shadow", Predicate::account(|_| true))
            .unwrap_err();
        assert!(matches!(err, DetectorError::InvalidInput(_)));
        assert!(registry.register_custom(" ", "Blank", Predicate::Manual).is_err());
    }

    #[test]
    fn unset_toggles_are_enabled_and_admin_flag_is_forced() {
        let registry = registry();
        let settings = DetectorSettings::default()
            .with_rule("numbers", false)
            .with_rule("admin_flag", false);
        let enabled = registry.enabled_keys(&settings);
        assert!(!enabled.contains("numbers"));
        assert!(enabled.contains("no_vowels"));
        assert!(enabled.contains("admin_flag"));
        assert!(registry.is_enabled("admin_flag", &settings));
    }

    #[test]
    fn order_keys_uses_display_order() {
        let registry = registry();
        let flags = FlagSet::new([
            RuleKey::ADMIN_FLAG,
            RuleKey::new("legacy_rule"),
            RuleKey::NUMBERS,
            RuleKey::EXCESSIVE_UPPERCASE,
        ])
        .unwrap();
        let ordered: Vec<String> = registry
            .order_keys(&flags)
            .into_iter()
            .map(|key| key.to_string())
            .collect();
        assert_eq!(
            ordered,
            vec!["excessive_uppercase", "numbers", "admin_flag", "legacy_rule"]
        );
    }

    #[test]
    fn name_predicates_skip_blank_fields() {
        let registry = registry();
        let predicate = registry.predicate("numbers").unwrap();
        let clean = Account::new(1, "jane", "jane@example.com").with_names("Jane", "Jane", "");
        let dirty = Account::new(2, "x", "x@example.com").with_names("", "", "Doe99");
        assert!(!predicate.matches(&clean));
        assert!(predicate.matches(&dirty));
        assert!(registry.predicate("admin_flag").unwrap().test_value("x").is_none());
    }
}
