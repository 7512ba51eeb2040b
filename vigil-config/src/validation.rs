use super::models::Config;

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Flags settings that work but degrade the deployment.
pub fn collect_warnings(config: &Config) -> ConfigWarnings {
    let mut warnings = ConfigWarnings::default();

    if config.database.primary_url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured; verdicts are kept in memory and lost on restart",
            "Set DATABASE_URL to a postgres:// connection string",
        );
    }

    if config.redis.is_none() {
        warnings.push(
            "REDIS_URL not configured; the flagged-account count is cached in process",
        );
    }

    if config.auth.operator_token.is_none() {
        warnings.push_with_hint(
            "VIGIL_OPERATOR_TOKEN not configured; overrides and bulk actions are disabled",
            "Set VIGIL_OPERATOR_TOKEN or [auth].operator_token",
        );
    }

    if config.detector.flagged_count_ttl_secs == 0 {
        warnings.push(
            "detector.flagged_count_ttl_secs is 0; every count request queries storage",
        );
    }

    if config.detector.scan_batch_size == 0 {
        warnings.push("detector.scan_batch_size is 0; batches are clamped to one account");
    }

    warnings
}
