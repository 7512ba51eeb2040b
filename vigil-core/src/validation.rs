//! Single-field checks for form adapters, reusing the account predicates.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::rules::RuleRegistry;
use crate::settings::SettingsProvider;
use crate::verdict::RuleKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Name,
    Email,
    Username,
    Description,
}

impl FieldKind {
    fn rules(self) -> &'static [RuleKey] {
        const NAME: &[RuleKey] = &[
            RuleKey::EXCESSIVE_UPPERCASE,
            RuleKey::NO_VOWELS,
            RuleKey::CONSONANT_CLUSTER,
            RuleKey::NUMBERS,
            RuleKey::SPECIAL_CHARACTERS,
            RuleKey::SPAM_WORDS,
        ];
        const EMAIL: &[RuleKey] = &[
            RuleKey::INVALID_EMAIL_DOMAIN,
            RuleKey::EXCESSIVE_PERIODS_EMAIL,
        ];
        const USERNAME: &[RuleKey] = &[RuleKey::URL_IN_USERNAME];
        const DESCRIPTION: &[RuleKey] = &[RuleKey::SPAM_WORDS];

        match self {
            Self::Name => NAME,
            Self::Email => EMAIL,
            Self::Username => USERNAME,
            Self::Description => DESCRIPTION,
        }
    }
}

fn issue_label(key: &RuleKey) -> &'static str {
    match key.as_str() {
        "excessive_uppercase" => "Excessive uppercase letters",
        "no_vowels" => "No vowels",
        "consonant_cluster" => "Suspicious consonant clusters",
        "numbers" => "Contains numbers",
        "special_characters" => "Contains special characters",
        "spam_words" => "Contains spam words",
        "invalid_email_domain" => "Invalid domain",
        "excessive_periods_email" => "Excessive periods",
        "url_in_username" => "Contains URL",
        _ => "Failed a check",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReport {
    pub field: FieldKind,
    pub is_valid: bool,
    /// Fired rules, first occurrence order, no duplicates.
    pub flags: Vec<RuleKey>,
    pub message: Option<String>,
}

/// Applies the enabled built-in predicates to form values.
#[derive(Clone)]
pub struct FieldValidator {
    registry: Arc<RuleRegistry>,
    settings: Arc<dyn SettingsProvider>,
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator").finish_non_exhaustive()
    }
}

impl FieldValidator {
    pub fn new(registry: Arc<RuleRegistry>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { registry, settings }
    }

    /// Validates one field. Name fields may carry several parts (first and
    /// last name); every non-empty part is checked.
    pub fn validate(&self, field: FieldKind, values: &[&str]) -> FieldReport {
        let mut flags: Vec<RuleKey> = Vec::new();
        for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            for key in field.rules() {
                if flags.contains(key)
                    || !self.registry.is_enabled(key.as_str(), self.settings.as_ref())
                {
                    continue;
                }
                let fired = self
                    .registry
                    .predicate(key.as_str())
                    .and_then(|predicate| predicate.test_value(value))
                    .unwrap_or(false);
                if fired {
                    flags.push(key.clone());
                }
            }
        }

        let message = (!flags.is_empty()).then(|| Self::message(field, &flags));
        FieldReport {
            field,
            is_valid: flags.is_empty(),
            flags,
            message,
        }
    }

    fn message(field: FieldKind, flags: &[RuleKey]) -> String {
        let issues: Vec<&str> = flags.iter().map(issue_label).collect();
        match field {
            FieldKind::Name => format!("{}.", issues.join(". ")),
            FieldKind::Email => format!("Email issue(s): {}.", issues.join(". ")),
            FieldKind::Username => "Username contains a URL.".to_string(),
            FieldKind::Description => "Description contains spam words.".to_string(),
        }
    }
}
