use crate::error::{AppError, Result};
use crate::models::{LedgerEntry, TransactionRecord};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const REFERENCE_INDEX: &str = "uq_transactions_reference_ci";

/// Repository for transaction headers and their atomic persistence together
/// with ledger entries.
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a transaction by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, transaction_kind, currency, reference, created_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Case-insensitive exact match on the client-supplied reference.
    pub async fn find_by_reference_ci(&self, reference: &str) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, transaction_kind, currency, reference, created_at
            FROM transactions
            WHERE LOWER(reference) = LOWER($1)
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Lists transactions touching an account (as source or destination),
    /// newest first.
    pub async fn find_by_account(&self, account_id: Uuid) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, from_account_id, to_account_id, amount, transaction_kind, currency, reference, created_at
            FROM transactions
            WHERE from_account_id = $1 OR to_account_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Inserts the transaction header and all its ledger entries on the
    /// caller's in-transaction connection. A unique violation on the
    /// case-insensitive reference index surfaces as `DuplicateReference`;
    /// the caller decides whether the colliding transaction satisfies the
    /// request.
    pub async fn insert_with_entries(
        &self,
        conn: &mut PgConnection,
        header: &TransactionRecord,
        entries: &[LedgerEntry],
    ) -> Result<TransactionRecord> {
        let persisted = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO transactions (id, from_account_id, to_account_id, amount, transaction_kind, currency, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, from_account_id, to_account_id, amount, transaction_kind, currency, reference, created_at
            "#,
        )
        .bind(header.id)
        .bind(header.from_account_id)
        .bind(header.to_account_id)
        .bind(header.amount)
        .bind(header.transaction_kind)
        .bind(header.currency)
        .bind(&header.reference)
        .bind(header.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| Self::map_insert_error(header.reference.as_deref(), e))?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries (id, account_id, transaction_id, entry_kind, amount, currency, description, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(entry.id)
            .bind(entry.account_id)
            .bind(entry.transaction_id)
            .bind(entry.entry_kind)
            .bind(entry.amount)
            .bind(entry.currency)
            .bind(&entry.description)
            .bind(entry.created_at)
            .execute(&mut *conn)
            .await
            .map_err(AppError::Database)?;
        }

        Ok(persisted)
    }

    fn map_insert_error(reference: Option<&str>, e: sqlx::Error) -> AppError {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505")
                && db.constraint() == Some(REFERENCE_INDEX)
            {
                return AppError::DuplicateReference(
                    reference.unwrap_or_default().to_string(),
                );
            }
        }
        AppError::Database(e)
    }
}
