use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::account::AccountId;
use crate::database::ports::verdicts::{VerdictRecord, VerdictRepository};
use crate::error::Result;
use crate::verdict::{SuspicionVerdict, VerdictStatus};

#[derive(Debug, Default)]
pub struct InMemoryVerdictRepository {
    verdicts: RwLock<BTreeMap<AccountId, (SuspicionVerdict, DateTime<Utc>)>>,
}

impl InMemoryVerdictRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerdictRepository for InMemoryVerdictRepository {
    async fn get_verdict(&self, id: AccountId) -> Result<SuspicionVerdict> {
        Ok(self
            .verdicts
            .read()
            .await
            .get(&id)
            .map(|(verdict, _)| verdict.clone())
            .unwrap_or_default())
    }

    async fn set_verdict(&self, id: AccountId, verdict: &SuspicionVerdict) -> Result<()> {
        let mut guard = self.verdicts.write().await;
        match verdict {
            SuspicionVerdict::NotChecked => {
                guard.remove(&id);
            }
            other => {
                guard.insert(id, (other.clone(), Utc::now()));
            }
        }
        Ok(())
    }

    async fn delete_verdict(&self, id: AccountId) -> Result<bool> {
        Ok(self.verdicts.write().await.remove(&id).is_some())
    }

    async fn count_flagged(&self) -> Result<u64> {
        Ok(self
            .verdicts
            .read()
            .await
            .values()
            .filter(|(verdict, _)| verdict.is_flagged())
            .count() as u64)
    }

    async fn list_by_status(
        &self,
        status: VerdictStatus,
        after: AccountId,
        limit: usize,
    ) -> Result<Vec<VerdictRecord>> {
        use std::ops::Bound::{Excluded, Unbounded};

        let guard = self.verdicts.read().await;
        Ok(guard
            .range((Excluded(after), Unbounded))
            .filter(|(_, (verdict, _))| verdict.status() == status)
            .take(limit)
            .map(|(id, (verdict, updated_at))| VerdictRecord {
                account_id: *id,
                verdict: verdict.clone(),
                updated_at: *updated_at,
            })
            .collect())
    }

    async fn purge_all(&self) -> Result<u64> {
        let mut guard = self.verdicts.write().await;
        let removed = guard.len() as u64;
        guard.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::FlagSet;

    #[tokio::test]
    async fn not_checked_is_never_stored() {
        let repo = InMemoryVerdictRepository::new();
        let id = AccountId(9);
        repo.set_verdict(id, &SuspicionVerdict::Flagged(FlagSet::admin()))
            .await
            .unwrap();
        assert_eq!(repo.count_flagged().await.unwrap(), 1);

        repo.set_verdict(id, &SuspicionVerdict::NotChecked).await.unwrap();
        assert_eq!(repo.get_verdict(id).await.unwrap(), SuspicionVerdict::NotChecked);
        assert_eq!(repo.count_flagged().await.unwrap(), 0);
        assert!(!repo.delete_verdict(id).await.unwrap());
    }

    #[tokio::test]
    async fn status_listing_pages_by_id() {
        let repo = InMemoryVerdictRepository::new();
        for id in 1..=6 {
            let verdict = if id % 2 == 0 {
                SuspicionVerdict::Flagged(FlagSet::admin())
            } else {
                SuspicionVerdict::Cleared
            };
            repo.set_verdict(AccountId(id), &verdict).await.unwrap();
        }
        let flagged = repo
            .list_by_status(VerdictStatus::Flagged, AccountId(2), 10)
            .await
            .unwrap();
        let ids: Vec<i64> = flagged.iter().map(|r| r.account_id.get()).collect();
        assert_eq!(ids, vec![4, 6]);

        assert_eq!(repo.purge_all().await.unwrap(), 6);
        assert_eq!(repo.count_flagged().await.unwrap(), 0);
    }
}
