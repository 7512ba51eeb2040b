use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::account::{Account, AccountId};
use crate::database::ports::accounts::AccountDirectory;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    pub async fn insert(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn list_accounts_page(&self, after: AccountId, limit: usize) -> Result<Vec<Account>> {
        use std::ops::Bound::{Excluded, Unbounded};

        let guard = self.accounts.read().await;
        Ok(guard
            .range((Excluded(after), Unbounded))
            .take(limit)
            .map(|(_, account)| account.clone())
            .collect())
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }
}
