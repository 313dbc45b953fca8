use crate::error::{AppError, Result};
use crate::models::{EntryKind, LedgerEntry};
use crate::repositories::LedgerRepository;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// Aggregates for one account over a reporting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementSummary {
    pub account_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub opening_balance: Decimal,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub closing_balance: Decimal,
    pub transaction_count: i64,
    #[serde(skip)]
    pub entries: Vec<LedgerEntry>,
}

/// Pure derivation of balances from ledger entries. The ledger is the sole
/// source of truth; nothing here mutates state, and every operation may run
/// outside a transaction.
pub struct BalanceService {
    ledger_repo: LedgerRepository,
}

impl BalanceService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger_repo: LedgerRepository::new(pool),
        }
    }

    /// Current balance: sum of credits minus sum of debits.
    pub async fn balance(&self, account_id: Uuid) -> Result<Decimal> {
        self.ledger_repo.signed_sum_for_account(account_id).await
    }

    /// Balance over entries with timestamp <= t.
    pub async fn balance_as_of(&self, account_id: Uuid, t: DateTime<Utc>) -> Result<Decimal> {
        self.ledger_repo.signed_sum_as_of(account_id, t).await
    }

    /// Balance over entries strictly before t; the opening balance of a
    /// statement window starting at t.
    pub async fn balance_before(&self, account_id: Uuid, t: DateTime<Utc>) -> Result<Decimal> {
        self.ledger_repo.signed_sum_before(account_id, t).await
    }

    /// Folds a running balance over entries already ordered by the
    /// `(timestamp, id)` ascending sort key, starting from `opening`.
    pub fn running_balance(
        opening: Decimal,
        entries: &[LedgerEntry],
    ) -> Vec<(LedgerEntry, Decimal)> {
        let mut running = opening;
        entries
            .iter()
            .map(|entry| {
                running += entry.signed_amount();
                (entry.clone(), running)
            })
            .collect()
    }

    /// Period statement over the inclusive window [t0, t1].
    pub async fn statement(
        &self,
        account_id: Uuid,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
    ) -> Result<StatementSummary> {
        let opening_balance = self.balance_before(account_id, t0).await?;
        let entries = self
            .ledger_repo
            .find_by_account_between(account_id, t0, t1)
            .await?;

        let mut total_debits = Decimal::ZERO;
        let mut total_credits = Decimal::ZERO;
        let mut transaction_ids = HashSet::new();
        for entry in &entries {
            match entry.entry_kind {
                EntryKind::Debit => total_debits += entry.amount,
                EntryKind::Credit => total_credits += entry.amount,
            }
            transaction_ids.insert(entry.transaction_id);
        }

        Ok(StatementSummary {
            account_id,
            period_start: t0,
            period_end: t1,
            opening_balance,
            total_debits,
            total_credits,
            closing_balance: opening_balance + total_credits - total_debits,
            transaction_count: transaction_ids.len() as i64,
            entries,
        })
    }

    /// Zero-sum invariant for a single transaction: debits equal credits.
    pub async fn verify_transaction_zero_sum(&self, transaction_id: Uuid) -> Result<bool> {
        let (debits, credits) = self.ledger_repo.debit_credit_totals(transaction_id).await?;
        Ok(debits == credits)
    }

    /// Self-check that the two ways of deriving a balance agree: the signed
    /// sum and the per-kind totals. Returns the balance, or surfaces
    /// `BalanceVerification` on drift.
    pub async fn verify_account_balance(&self, account_id: Uuid) -> Result<Decimal> {
        let signed = self.ledger_repo.signed_sum_for_account(account_id).await?;
        let credits = self
            .ledger_repo
            .sum_by_account_and_kind(account_id, EntryKind::Credit)
            .await?;
        let debits = self
            .ledger_repo
            .sum_by_account_and_kind(account_id, EntryKind::Debit)
            .await?;

        let expected = credits - debits;
        if signed != expected {
            return Err(AppError::BalanceVerification {
                account_id,
                expected,
                actual: signed,
            });
        }
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use rust_decimal_macros::dec;

    fn credit(amount: Decimal) -> LedgerEntry {
        LedgerEntry::credit(Uuid::new_v4(), Uuid::new_v4(), amount, Currency::EUR)
    }

    fn debit(amount: Decimal) -> LedgerEntry {
        LedgerEntry::debit(Uuid::new_v4(), Uuid::new_v4(), amount, Currency::EUR)
    }

    #[test]
    fn test_running_balance_from_zero() {
        let entries = vec![credit(dec!(1000.00)), debit(dec!(300.00))];

        let rows = BalanceService::running_balance(Decimal::ZERO, &entries);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, dec!(1000.00));
        assert_eq!(rows[1].1, dec!(700.00));
    }

    #[test]
    fn test_running_balance_with_opening() {
        let entries = vec![debit(dec!(50.00)), credit(dec!(25.00)), debit(dec!(10.00))];

        let rows = BalanceService::running_balance(dec!(100.00), &entries);

        assert_eq!(rows[0].1, dec!(50.00));
        assert_eq!(rows[1].1, dec!(75.00));
        assert_eq!(rows[2].1, dec!(65.00));
    }

    #[test]
    fn test_running_balance_empty() {
        let rows = BalanceService::running_balance(dec!(42), &[]);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_running_balance_may_go_negative() {
        // System accounts fund the wallet and legitimately run negative.
        let entries = vec![debit(dec!(1000.00)), credit(dec!(400.00))];

        let rows = BalanceService::running_balance(Decimal::ZERO, &entries);

        assert_eq!(rows[0].1, dec!(-1000.00));
        assert_eq!(rows[1].1, dec!(-600.00));
    }
}
