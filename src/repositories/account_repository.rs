use crate::error::{AppError, Result};
use crate::models::Account;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Repository for Account rows. Accounts are insert-only; (currency, kind)
/// never change after creation.
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new account.
    pub async fn create(&self, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, account_kind, currency, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_kind, currency, created_at
            "#,
        )
        .bind(account.id)
        .bind(account.account_kind)
        .bind(account.currency)
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Finds an account by its UUID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, account_kind, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Checks whether an account exists.
    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Acquires a row-level exclusive lock on a single account within the
    /// caller's transaction and returns the current row.
    pub async fn find_by_id_for_update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, account_kind, currency, created_at
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Locks the listed accounts in the caller-supplied order and returns
    /// their rows. The input order is the caller's deadlock-avoidance
    /// contract; the store never reorders it.
    pub async fn lock_in_order(
        &self,
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<Account>> {
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            let account = self
                .find_by_id_for_update(conn, *id)
                .await?
                .ok_or(AppError::AccountNotFound(*id))?;
            accounts.push(account);
        }
        Ok(accounts)
    }
}
