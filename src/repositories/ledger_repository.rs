use crate::error::{AppError, Result};
use crate::models::{EntryKind, LedgerEntry};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Read side of the ledger. Entries are append-only; every query here is
/// non-mutating. Ordering ties on the wall-clock timestamp are broken by
/// entry id so that running balances are deterministic.
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All entries belonging to one transaction (expected size 2).
    pub async fn find_by_transaction(&self, transaction_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, account_id, transaction_id, entry_kind, amount, currency, description, created_at
            FROM ledger_entries
            WHERE transaction_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Entries for an account, newest first, with pagination and an optional
    /// entry-kind filter.
    pub async fn find_by_account(
        &self,
        account_id: Uuid,
        limit: i64,
        offset: i64,
        kind_filter: Option<EntryKind>,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, account_id, transaction_id, entry_kind, amount, currency, description, created_at
            FROM ledger_entries
            WHERE account_id = $1
              AND ($4::entry_kind IS NULL OR entry_kind = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .bind(kind_filter)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// One page of an account's entries in `(created_at, id)` ascending
    /// order, the sort key running balances are defined over.
    pub async fn find_page_by_account_asc(
        &self,
        account_id: Uuid,
        page_size: i64,
        page_number: i64,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, account_id, transaction_id, entry_kind, amount, currency, description, created_at
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY created_at, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_id)
        .bind(page_size)
        .bind(page_size * page_number)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Total entry count for an account, for page metadata.
    pub async fn count_by_account(&self, account_id: Uuid) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM ledger_entries
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Entries strictly before `t`, ascending. Used for statement openings.
    pub async fn find_by_account_before(
        &self,
        account_id: Uuid,
        t: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, account_id, transaction_id, entry_kind, amount, currency, description, created_at
            FROM ledger_entries
            WHERE account_id = $1 AND created_at < $2
            ORDER BY created_at, id
            "#,
        )
        .bind(account_id)
        .bind(t)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Entries in the inclusive window [t0, t1], ascending.
    pub async fn find_by_account_between(
        &self,
        account_id: Uuid,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, account_id, transaction_id, entry_kind, amount, currency, description, created_at
            FROM ledger_entries
            WHERE account_id = $1 AND created_at >= $2 AND created_at <= $3
            ORDER BY created_at, id
            "#,
        )
        .bind(account_id)
        .bind(t0)
        .bind(t1)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Sum of absolute amounts for an account restricted to one entry kind.
    pub async fn sum_by_account_and_kind(
        &self,
        account_id: Uuid,
        entry_kind: EntryKind,
    ) -> Result<Decimal> {
        let row: (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM ledger_entries
            WHERE account_id = $1 AND entry_kind = $2
            "#,
        )
        .bind(account_id)
        .bind(entry_kind)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Derived balance: sum of credits minus sum of debits.
    pub async fn signed_sum_for_account(&self, account_id: Uuid) -> Result<Decimal> {
        let row: (Decimal,) = sqlx::query_as(SIGNED_SUM_SQL)
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Derived balance on the caller's in-transaction connection. Under row
    /// locks on the account this is a consistent read of its ledger.
    pub async fn signed_sum_on(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
    ) -> Result<Decimal> {
        let row: (Decimal,) = sqlx::query_as(SIGNED_SUM_SQL)
            .bind(account_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Derived balance over entries with `created_at <= t`.
    pub async fn signed_sum_as_of(
        &self,
        account_id: Uuid,
        t: DateTime<Utc>,
    ) -> Result<Decimal> {
        let row: (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(CASE WHEN entry_kind = 'CREDIT' THEN amount ELSE -amount END), 0)
            FROM ledger_entries
            WHERE account_id = $1 AND created_at <= $2
            "#,
        )
        .bind(account_id)
        .bind(t)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Derived balance over entries strictly before `t`.
    pub async fn signed_sum_before(
        &self,
        account_id: Uuid,
        t: DateTime<Utc>,
    ) -> Result<Decimal> {
        let row: (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(CASE WHEN entry_kind = 'CREDIT' THEN amount ELSE -amount END), 0)
            FROM ledger_entries
            WHERE account_id = $1 AND created_at < $2
            "#,
        )
        .bind(account_id)
        .bind(t)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Signed sum of the first `offset` entries in ascending order: the
    /// opening balance of a ledger page.
    pub async fn sum_before_offset(&self, account_id: Uuid, offset: i64) -> Result<Decimal> {
        let row: (Decimal,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(CASE WHEN entry_kind = 'CREDIT' THEN amount ELSE -amount END), 0)
            FROM (
                SELECT entry_kind, amount
                FROM ledger_entries
                WHERE account_id = $1
                ORDER BY created_at, id
                LIMIT $2
            ) page_prefix
            "#,
        )
        .bind(account_id)
        .bind(offset)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Debit and credit totals for one transaction, for the zero-sum check.
    pub async fn debit_credit_totals(&self, transaction_id: Uuid) -> Result<(Decimal, Decimal)> {
        let row: (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN entry_kind = 'DEBIT' THEN amount ELSE 0 END), 0) AS debits,
                COALESCE(SUM(CASE WHEN entry_kind = 'CREDIT' THEN amount ELSE 0 END), 0) AS credits
            FROM ledger_entries
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}

const SIGNED_SUM_SQL: &str = r#"
    SELECT COALESCE(SUM(CASE WHEN entry_kind = 'CREDIT' THEN amount ELSE -amount END), 0)
    FROM ledger_entries
    WHERE account_id = $1
"#;
