use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Currency;

/// Kind of wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// External funds entering a wallet via the system account.
    Deposit,
    /// Funds leaving a wallet toward the system account.
    Withdrawal,
    /// Wallet-to-wallet movement.
    Transfer,
    /// Stake placed on a game round.
    GameBet,
    /// Winnings paid out for a game round.
    GameWin,
    /// Promotional award onto a bonus account.
    BonusAward,
    /// Jackpot pool payout.
    JackpotWin,
}

/// Metadata binding a balanced set of ledger entries into one logical unit.
/// The header never stores balances; those are derived from the entries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub transaction_kind: TransactionKind,
    pub currency: Currency,
    /// Client-supplied idempotency reference, unique case-insensitively.
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        transaction_kind: TransactionKind,
        currency: Currency,
        reference: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account_id,
            to_account_id,
            amount,
            transaction_kind,
            currency,
            reference,
            created_at: Utc::now(),
        }
    }

    /// Returns true when this header matches the request parameters a
    /// replayed reference must agree on.
    pub fn matches_request(
        &self,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        currency: Currency,
    ) -> bool {
        self.from_account_id == from_account_id
            && self.to_account_id == to_account_id
            && self.amount == amount
            && self.currency == currency
    }

    /// Case-insensitive comparison against a candidate reference.
    pub fn reference_matches(&self, candidate: &str) -> bool {
        self.reference
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(candidate))
    }
}
