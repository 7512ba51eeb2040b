use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::account::AccountId;
use crate::database::ports::verdicts::{VerdictRecord, VerdictRepository};
use crate::error::{DetectorError, Result};
use crate::verdict::{FlagSet, RuleKey, SuspicionVerdict, VerdictStatus};

#[derive(Debug, Clone)]
pub struct PostgresVerdictRepository {
    pool: PgPool,
}

impl PostgresVerdictRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn decode(status: &str, flags: Vec<String>) -> Result<SuspicionVerdict> {
        match status.parse::<VerdictStatus>()? {
            VerdictStatus::Cleared => Ok(SuspicionVerdict::Cleared),
            VerdictStatus::Flagged => FlagSet::new(flags.into_iter().map(RuleKey::from))
                .map(SuspicionVerdict::Flagged)
                .ok_or_else(|| DetectorError::Storage("flagged verdict without flags".into())),
            VerdictStatus::NotChecked => Ok(SuspicionVerdict::NotChecked),
        }
    }

    fn map_row(row: &PgRow) -> Result<VerdictRecord> {
        let account_id: i64 = row
            .try_get("account_id")
            .map_err(|e| DetectorError::Storage(format!("Failed to read account_id: {e}")))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| DetectorError::Storage(format!("Failed to read status: {e}")))?;
        let flags: Vec<String> = row
            .try_get("flags")
            .map_err(|e| DetectorError::Storage(format!("Failed to read flags: {e}")))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| DetectorError::Storage(format!("Failed to read updated_at: {e}")))?;

        Ok(VerdictRecord {
            account_id: AccountId(account_id),
            verdict: Self::decode(&status, flags)?,
            updated_at,
        })
    }
}

#[async_trait]
impl VerdictRepository for PostgresVerdictRepository {
    async fn get_verdict(&self, id: AccountId) -> Result<SuspicionVerdict> {
        let row = sqlx::query("SELECT status, flags FROM account_verdicts WHERE account_id = $1")
            .bind(id.get())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| DetectorError::Storage(format!("Failed to load verdict for {id}: {e}")))?;

        let Some(row) = row else {
            return Ok(SuspicionVerdict::NotChecked);
        };
        let status: String = row
            .try_get("status")
            .map_err(|e| DetectorError::Storage(format!("Failed to read status: {e}")))?;
        let flags: Vec<String> = row
            .try_get("flags")
            .map_err(|e| DetectorError::Storage(format!("Failed to read flags: {e}")))?;
        Self::decode(&status, flags)
    }

    async fn set_verdict(&self, id: AccountId, verdict: &SuspicionVerdict) -> Result<()> {
        if matches!(verdict, SuspicionVerdict::NotChecked) {
            self.delete_verdict(id).await?;
            return Ok(());
        }
        let flags = verdict.flags().map(FlagSet::to_strings).unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO account_verdicts (account_id, status, flags, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (account_id) DO UPDATE
            SET status = EXCLUDED.status,
                flags = EXCLUDED.flags,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(id.get())
        .bind(verdict.status().as_str())
        .bind(flags)
        .execute(self.pool())
        .await
        .map_err(|e| DetectorError::Storage(format!("Failed to store verdict for {id}: {e}")))?;

        Ok(())
    }

    async fn delete_verdict(&self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM account_verdicts WHERE account_id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| {
                DetectorError::Storage(format!("Failed to delete verdict for {id}: {e}"))
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_flagged(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM account_verdicts WHERE status = 'flagged'")
                .fetch_one(self.pool())
                .await
                .map_err(|e| DetectorError::Storage(format!("Failed to count flagged: {e}")))?;

        Ok(count.max(0) as u64)
    }

    async fn list_by_status(
        &self,
        status: VerdictStatus,
        after: AccountId,
        limit: usize,
    ) -> Result<Vec<VerdictRecord>> {
        if status == VerdictStatus::NotChecked {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit)
            .map_err(|_| DetectorError::InvalidInput(format!("page size {limit} is too large")))?;
        let rows = sqlx::query(
            r#"
            SELECT account_id, status, flags, updated_at
            FROM account_verdicts
            WHERE status = $1 AND account_id > $2
            ORDER BY account_id ASC
            LIMIT $3
            "#,
        )
        .bind(status.as_str())
        .bind(after.get())
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| DetectorError::Storage(format!("Failed to list verdicts: {e}")))?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn purge_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM account_verdicts")
            .execute(self.pool())
            .await
            .map_err(|e| DetectorError::Storage(format!("Failed to purge verdicts: {e}")))?;

        Ok(result.rows_affected())
    }
}
