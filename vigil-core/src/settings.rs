//! Detector settings and the provider seam the orchestrator reads them through.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Read side of the detector configuration.
///
/// Every call reads the current value so toggles take effect without a
/// restart.
pub trait SettingsProvider: Send + Sync {
    /// Whether the rule is enabled. `None` means the operator never set it.
    fn rule_toggle(&self, key: &str) -> Option<bool>;
    fn recheck_cleared(&self) -> bool;
    fn auto_delete(&self) -> bool;
    fn log_flags(&self) -> bool;
    fn check_at_registration(&self) -> bool;
}

/// Thresholds and word lists used by the built-in predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Minimum number of letters before the uppercase ratio is considered.
    pub uppercase_min_letters: usize,
    /// Share of uppercase letters above which a name is flagged.
    pub uppercase_ratio: f64,
    /// Length of a consonant run that counts as a cluster.
    pub consonant_run: usize,
    /// Periods allowed in the local part of an email address.
    pub max_email_local_periods: usize,
    /// Punctuation accepted in names without tripping `special_characters`.
    pub allowed_name_punctuation: String,
    /// Case-insensitive substrings treated as spam.
    pub spam_words: Vec<String>,
    /// Email domains refused outright.
    pub blocked_email_domains: Vec<String>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            uppercase_min_letters: 4,
            uppercase_ratio: 0.5,
            consonant_run: 5,
            max_email_local_periods: 2,
            allowed_name_punctuation: " '-.".to_string(),
            spam_words: [
                "viagra", "casino", "crypto", "bitcoin", "forex", "loan", "porn", "seo",
                "backlink", "pharmacy", "betting", "escort", "replica", "free money",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_email_domains: [
                "mailinator.com",
                "guerrillamail.com",
                "10minutemail.com",
                "tempmail.com",
                "trashmail.com",
                "yopmail.com",
                "sharklasers.com",
                "dispostable.com",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Complete detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Explicit per-rule toggles. Keys absent from the map are enabled.
    pub rules: BTreeMap<String, bool>,
    pub recheck_cleared: bool,
    pub auto_delete: bool,
    pub log_flags: bool,
    pub check_at_registration: bool,
    pub registration_delay_secs: u64,
    pub scan_batch_size: usize,
    pub flagged_count_ttl_secs: u64,
    pub heuristics: HeuristicConfig,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            rules: BTreeMap::new(),
            recheck_cleared: false,
            auto_delete: false,
            log_flags: false,
            check_at_registration: true,
            registration_delay_secs: 10,
            scan_batch_size: 50,
            flagged_count_ttl_secs: 3 * 60 * 60,
            heuristics: HeuristicConfig::default(),
        }
    }
}

impl DetectorSettings {
    pub fn flagged_count_ttl(&self) -> Duration {
        Duration::from_secs(self.flagged_count_ttl_secs)
    }

    pub fn registration_delay(&self) -> Duration {
        Duration::from_secs(self.registration_delay_secs)
    }

    pub fn with_rule(mut self, key: impl Into<String>, enabled: bool) -> Self {
        self.rules.insert(key.into(), enabled);
        self
    }
}

impl SettingsProvider for DetectorSettings {
    fn rule_toggle(&self, key: &str) -> Option<bool> {
        self.rules.get(key).copied()
    }

    fn recheck_cleared(&self) -> bool {
        self.recheck_cleared
    }

    fn auto_delete(&self) -> bool {
        self.auto_delete
    }

    fn log_flags(&self) -> bool {
        self.log_flags
    }

    fn check_at_registration(&self) -> bool {
        self.check_at_registration
    }
}

/// Runtime-mutable settings shared between the orchestrator and the
/// surfaces that change them.
#[derive(Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<DetectorSettings>>,
}

impl fmt::Debug for SharedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSettings")
            .field("settings", &*self.inner.read())
            .finish()
    }
}

impl SharedSettings {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn snapshot(&self) -> DetectorSettings {
        self.inner.read().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut DetectorSettings)) {
        let mut guard = self.inner.write();
        f(&mut guard);
    }

    pub fn set_rule_enabled(&self, key: impl Into<String>, enabled: bool) {
        self.update(|settings| {
            settings.rules.insert(key.into(), enabled);
        });
    }
}

impl SettingsProvider for SharedSettings {
    fn rule_toggle(&self, key: &str) -> Option<bool> {
        self.inner.read().rule_toggle(key)
    }

    fn recheck_cleared(&self) -> bool {
        self.inner.read().recheck_cleared
    }

    fn auto_delete(&self) -> bool {
        self.inner.read().auto_delete
    }

    fn log_flags(&self) -> bool {
        self.inner.read().log_flags
    }

    fn check_at_registration(&self) -> bool {
        self.inner.read().check_at_registration
    }
}
