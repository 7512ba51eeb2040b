use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::account::{Account, AccountId};
use crate::database::ports::accounts::AccountDirectory;
use crate::error::{DetectorError, Result};

#[derive(Debug, Clone)]
pub struct PostgresAccountDirectory {
    pool: PgPool,
}

impl PostgresAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<Account> {
        let read = |column: &str| -> Result<String> {
            row.try_get(column)
                .map_err(|e| DetectorError::Storage(format!("Failed to read {column}: {e}")))
        };
        let id: i64 = row
            .try_get("id")
            .map_err(|e| DetectorError::Storage(format!("Failed to read account id: {e}")))?;

        Ok(Account {
            id: AccountId(id),
            username: read("username")?,
            email: read("email")?,
            display_name: read("display_name")?,
            first_name: read("first_name")?,
            last_name: read("last_name")?,
        })
    }
}

#[async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, display_name, first_name, last_name
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DetectorError::Storage(format!("Failed to load account {id}: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list_accounts_page(&self, after: AccountId, limit: usize) -> Result<Vec<Account>> {
        let limit = i64::try_from(limit)
            .map_err(|_| DetectorError::InvalidInput(format!("page size {limit} is too large")))?;
        let rows = sqlx::query(
            r#"
            SELECT id, username, email, display_name, first_name, last_name
            FROM accounts
            WHERE id > $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(after.get())
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| DetectorError::Storage(format!("Failed to list accounts: {e}")))?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.get())
            .execute(self.pool())
            .await
            .map_err(|e| DetectorError::Storage(format!("Failed to delete account {id}: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
