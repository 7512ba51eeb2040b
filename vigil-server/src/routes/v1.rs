use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    handlers::{accounts, admin, check, forms, scan},
    infra::app_state::AppState,
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        // Checks and overrides
        .route("/check", post(check::check_account_handler))
        .route("/override", post(check::override_handler))
        // Population scan
        .route("/scan/batch", post(scan::scan_batch_handler))
        .route("/flagged/count", get(scan::flagged_count_handler))
        // Admin views and bulk actions
        .route("/bulk", post(admin::bulk_action_handler))
        .route("/verdicts", get(admin::list_verdicts_handler))
        .route("/rules", get(admin::list_rules_handler))
        // Form adapters
        .route("/validate", post(forms::validate_field_handler))
        // Account lifecycle events
        .route("/accounts/registered", post(accounts::account_registered_handler))
        .route("/accounts/deleted", post(accounts::account_deleted_handler))
}
