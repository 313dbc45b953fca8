use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Currency;

/// Wallet account kinds. Each kind carries a debit policy that decides
/// whether a transfer may take value out of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    /// Player's spendable funds.
    Main,
    /// Promotional funds; locked until converted, never debited directly.
    Bonus,
    /// Funds awaiting clearance; not debitable.
    Pending,
    /// Accumulating jackpot pool; debitable up to its balance.
    Jackpot,
    /// Operator funding account; may go negative.
    System,
}

/// Outcome of asking whether an account kind may be debited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitPolicy {
    /// Debits allowed up to the current derived balance.
    Allowed,
    /// Debits never allowed for this kind.
    Denied,
    /// Debits allowed without a floor; the balance may go negative.
    Unbounded,
}

impl AccountKind {
    pub fn debit_policy(&self) -> DebitPolicy {
        match self {
            AccountKind::Main | AccountKind::Jackpot => DebitPolicy::Allowed,
            AccountKind::Bonus | AccountKind::Pending => DebitPolicy::Denied,
            AccountKind::System => DebitPolicy::Unbounded,
        }
    }

    /// Returns true if a transfer may debit this kind at all.
    pub fn may_debit(&self) -> bool {
        !matches!(self.debit_policy(), DebitPolicy::Denied)
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MAIN" => Ok(AccountKind::Main),
            "BONUS" => Ok(AccountKind::Bonus),
            "PENDING" => Ok(AccountKind::Pending),
            "JACKPOT" => Ok(AccountKind::Jackpot),
            "SYSTEM" => Ok(AccountKind::System),
            other => Err(format!("Unknown account type: {}", other)),
        }
    }
}

/// A wallet account. (currency, kind) is fixed at creation and the account
/// carries no stored balance; balance is always derived from ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub account_kind: AccountKind,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_kind: AccountKind, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_kind,
            currency,
            created_at: Utc::now(),
        }
    }
}
