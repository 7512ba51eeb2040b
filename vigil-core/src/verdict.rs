use std::borrow::{Borrow, Cow};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DetectorError;

/// Identifier of a rule, stable across releases and persisted with verdicts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleKey(Cow<'static, str>);

impl RuleKey {
    pub const EXCESSIVE_UPPERCASE: Self = Self::from_static("excessive_uppercase");
    pub const NO_VOWELS: Self = Self::from_static("no_vowels");
    pub const CONSONANT_CLUSTER: Self = Self::from_static("consonant_cluster");
    pub const NUMBERS: Self = Self::from_static("numbers");
    pub const SPECIAL_CHARACTERS: Self = Self::from_static("special_characters");
    pub const SPAM_WORDS: Self = Self::from_static("spam_words");
    pub const INVALID_EMAIL_DOMAIN: Self = Self::from_static("invalid_email_domain");
    pub const EXCESSIVE_PERIODS_EMAIL: Self = Self::from_static("excessive_periods_email");
    pub const URL_IN_USERNAME: Self = Self::from_static("url_in_username");
    /// Synthetic key attached by a manual override. Never disabled.
    pub const ADMIN_FLAG: Self = Self::from_static("admin_flag");

    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    pub fn new(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin_flag(&self) -> bool {
        self.as_str() == Self::ADMIN_FLAG.as_str()
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Borrow<str> for RuleKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for RuleKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RuleKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Non-empty set of fired rule keys.
///
/// There is no way to build an empty `FlagSet`; an evaluation that fires
/// nothing is a [`SuspicionVerdict::Cleared`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeSet<RuleKey>", into = "BTreeSet<RuleKey>")]
pub struct FlagSet(BTreeSet<RuleKey>);

impl FlagSet {
    /// Returns `None` when `keys` is empty.
    pub fn new(keys: impl IntoIterator<Item = RuleKey>) -> Option<Self> {
        let keys: BTreeSet<RuleKey> = keys.into_iter().collect();
        if keys.is_empty() { None } else { Some(Self(keys)) }
    }

    pub fn single(key: RuleKey) -> Self {
        Self(BTreeSet::from([key]))
    }

    pub fn admin() -> Self {
        Self::single(RuleKey::ADMIN_FLAG)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleKey> {
        self.0.iter()
    }

    /// Keeps only keys present in `enabled`. `None` when nothing survives.
    pub fn retain_enabled(&self, enabled: &BTreeSet<RuleKey>) -> Option<Self> {
        Self::new(self.0.intersection(enabled).cloned())
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|key| key.as_str().to_owned()).collect()
    }
}

impl TryFrom<BTreeSet<RuleKey>> for FlagSet {
    type Error = DetectorError;

    fn try_from(value: BTreeSet<RuleKey>) -> Result<Self, Self::Error> {
        Self::new(value)
            .ok_or_else(|| DetectorError::InvalidInput("flag set must not be empty".into()))
    }
}

impl From<FlagSet> for BTreeSet<RuleKey> {
    fn from(value: FlagSet) -> Self {
        value.0
    }
}

impl<'a> IntoIterator for &'a FlagSet {
    type Item = &'a RuleKey;
    type IntoIter = std::collections::btree_set::Iter<'a, RuleKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Last recorded classification of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "flags", rename_all = "snake_case")]
pub enum SuspicionVerdict {
    #[default]
    NotChecked,
    Cleared,
    Flagged(FlagSet),
}

impl SuspicionVerdict {
    /// Builds a verdict from an evaluation result.
    pub fn from_flags(flags: impl IntoIterator<Item = RuleKey>) -> Self {
        match FlagSet::new(flags) {
            Some(set) => Self::Flagged(set),
            None => Self::Cleared,
        }
    }

    pub fn status(&self) -> VerdictStatus {
        match self {
            Self::NotChecked => VerdictStatus::NotChecked,
            Self::Cleared => VerdictStatus::Cleared,
            Self::Flagged(_) => VerdictStatus::Flagged,
        }
    }

    pub fn flags(&self) -> Option<&FlagSet> {
        match self {
            Self::Flagged(flags) => Some(flags),
            _ => None,
        }
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged(_))
    }
}

/// Verdict discriminant, used for storage and status filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    NotChecked,
    Cleared,
    Flagged,
}

impl VerdictStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotChecked => "not_checked",
            Self::Cleared => "cleared",
            Self::Flagged => "flagged",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerdictStatus {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_checked" => Ok(Self::NotChecked),
            "cleared" => Ok(Self::Cleared),
            "flagged" => Ok(Self::Flagged),
            other => Err(DetectorError::InvalidInput(format!(
                "unknown verdict status '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flag_set_cannot_be_built() {
        assert!(FlagSet::new(Vec::new()).is_none());
        assert_eq!(SuspicionVerdict::from_flags(Vec::new()), SuspicionVerdict::Cleared);
    }

    #[test]
    fn duplicate_keys_collapse() {
        let flags = FlagSet::new([RuleKey::NUMBERS, RuleKey::new("numbers")]).unwrap();
        assert_eq!(flags.len(), 1);
        assert!(flags.contains("numbers"));
    }

    #[test]
    fn retain_enabled_drops_disabled_keys() {
        let flags = FlagSet::new([RuleKey::NUMBERS, RuleKey::NO_VOWELS]).unwrap();
        let enabled = BTreeSet::from([RuleKey::NO_VOWELS, RuleKey::ADMIN_FLAG]);
        let kept = flags.retain_enabled(&enabled).unwrap();
        assert_eq!(kept.to_strings(), vec!["no_vowels".to_string()]);

        let none_enabled = BTreeSet::from([RuleKey::ADMIN_FLAG]);
        assert!(flags.retain_enabled(&none_enabled).is_none());
    }

    #[test]
    fn flagged_verdict_rejects_empty_payload() {
        let json = r#"{"status":"flagged","flags":[]}"#;
        assert!(serde_json::from_str::<SuspicionVerdict>(json).is_err());

        let json = r#"{"status":"flagged","flags":["admin_flag"]}"#;
        let verdict: SuspicionVerdict = serde_json::from_str(json).unwrap();
        assert_eq!(verdict, SuspicionVerdict::Flagged(FlagSet::admin()));
    }

    #[test]
    fn status_parses_from_storage_form() {
        for status in [VerdictStatus::NotChecked, VerdictStatus::Cleared, VerdictStatus::Flagged] {
            assert_eq!(status.as_str().parse::<VerdictStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<VerdictStatus>().is_err());
    }
}
