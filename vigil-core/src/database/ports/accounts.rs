use async_trait::async_trait;

use crate::account::{Account, AccountId};
use crate::error::Result;

/// Read/delete access to the account population.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Accounts with an id strictly greater than `after`, ascending, at most
    /// `limit` of them.
    async fn list_accounts_page(&self, after: AccountId, limit: usize) -> Result<Vec<Account>>;

    /// Returns `false` when the account did not exist.
    async fn delete_account(&self, id: AccountId) -> Result<bool>;
}
