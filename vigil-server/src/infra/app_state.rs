use std::{fmt, sync::Arc};

use vigil_config::Config;
use vigil_core::{
    AccountCheckOrchestrator, BatchScanCoordinator, FieldValidator,
    FlaggedCountCache, RuleRegistry, SharedSettings,
    database::{AccountDirectory, CountCache, VerdictRepository},
};

/// Storage backends the detector runs against.
#[derive(Clone)]
pub struct Backends {
    pub directory: Arc<dyn AccountDirectory>,
    pub verdicts: Arc<dyn VerdictRepository>,
    pub count_cache: Arc<dyn CountCache>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: SharedSettings,
    pub orchestrator: Arc<AccountCheckOrchestrator>,
    pub scanner: BatchScanCoordinator,
    pub validator: FieldValidator,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Arc<Config>, backends: Backends) -> Self {
        Self::with_registry(
            Arc::clone(&config),
            backends,
            RuleRegistry::with_builtins(&config.detector.heuristics),
        )
    }

    /// Builds the state around a registry that may carry custom rules.
    pub fn with_registry(
        config: Arc<Config>,
        backends: Backends,
        registry: RuleRegistry,
    ) -> Self {
        let settings = SharedSettings::new(config.detector.clone());
        let registry = Arc::new(registry);
        let flagged_count = FlaggedCountCache::new(
            Arc::clone(&backends.verdicts),
            backends.count_cache,
            config.detector.flagged_count_ttl(),
        );
        let orchestrator = Arc::new(AccountCheckOrchestrator::new(
            backends.directory,
            backends.verdicts,
            Arc::clone(&registry),
            Arc::new(settings.clone()),
            flagged_count,
        ));

        Self {
            scanner: BatchScanCoordinator::new(Arc::clone(&orchestrator)),
            validator: FieldValidator::new(registry, Arc::new(settings.clone())),
            config,
            settings,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn operator_token(&self) -> Option<&str> {
        self.config.auth.operator_token.as_deref()
    }
}
