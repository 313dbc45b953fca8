use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Currency;

/// Entry kind for double-entry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    /// Debit entry - value leaving the account.
    Debit,
    /// Credit entry - value arriving at the account.
    Credit,
}

impl EntryKind {
    /// Returns the opposite entry kind.
    pub fn opposite(&self) -> Self {
        match self {
            EntryKind::Debit => EntryKind::Credit,
            EntryKind::Credit => EntryKind::Debit,
        }
    }

    /// Sign multiplier from the account holder's perspective:
    /// credits increase the balance, debits decrease it.
    pub fn sign(&self) -> i32 {
        match self {
            EntryKind::Debit => -1,
            EntryKind::Credit => 1,
        }
    }
}

/// One immutable side of a value movement. The stored amount is always the
/// absolute value; sign is derived from the entry kind.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_id: Uuid,
    pub entry_kind: EntryKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a new debit entry.
    pub fn debit(
        transaction_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            transaction_id,
            entry_kind: EntryKind::Debit,
            amount,
            currency,
            description: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a new credit entry.
    pub fn credit(
        transaction_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            transaction_id,
            entry_kind: EntryKind::Credit,
            amount,
            currency,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Signed amount: positive for credit, negative for debit.
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_kind {
            EntryKind::Credit => self.amount,
            EntryKind::Debit => -self.amount,
        }
    }

    pub fn is_credit(&self) -> bool {
        self.entry_kind == EntryKind::Credit
    }
}

/// The balanced debit/credit pair produced by a transfer.
#[derive(Debug, Clone)]
pub struct EntryPair {
    pub debit: LedgerEntry,
    pub credit: LedgerEntry,
}

impl EntryPair {
    /// Creates a new pair. Validates kinds, positivity, and that the two
    /// sides balance in amount and currency.
    pub fn new(debit: LedgerEntry, credit: LedgerEntry) -> Result<Self, EntryPairError> {
        if debit.entry_kind != EntryKind::Debit {
            return Err(EntryPairError::WrongKind("debit side must be a DEBIT entry"));
        }
        if credit.entry_kind != EntryKind::Credit {
            return Err(EntryPairError::WrongKind("credit side must be a CREDIT entry"));
        }
        if debit.amount <= Decimal::ZERO {
            return Err(EntryPairError::NonPositiveAmount(debit.amount));
        }
        if debit.amount != credit.amount {
            return Err(EntryPairError::Unbalanced {
                debit_amount: debit.amount,
                credit_amount: credit.amount,
            });
        }
        if debit.currency != credit.currency {
            return Err(EntryPairError::CurrencyMismatch {
                debit_currency: debit.currency,
                credit_currency: credit.currency,
            });
        }
        Ok(Self { debit, credit })
    }

    pub fn amount(&self) -> Decimal {
        self.debit.amount
    }

    pub fn currency(&self) -> Currency {
        self.debit.currency
    }
}

#[derive(Debug, Clone)]
pub enum EntryPairError {
    WrongKind(&'static str),
    NonPositiveAmount(Decimal),
    Unbalanced {
        debit_amount: Decimal,
        credit_amount: Decimal,
    },
    CurrencyMismatch {
        debit_currency: Currency,
        credit_currency: Currency,
    },
}

impl std::fmt::Display for EntryPairError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryPairError::WrongKind(msg) => write!(f, "Invalid entry kind: {}", msg),
            EntryPairError::NonPositiveAmount(amount) => {
                write!(f, "Entry amount must be positive, got {}", amount)
            }
            EntryPairError::Unbalanced {
                debit_amount,
                credit_amount,
            } => write!(
                f,
                "Unbalanced entries: debit {} != credit {}",
                debit_amount, credit_amount
            ),
            EntryPairError::CurrencyMismatch {
                debit_currency,
                credit_currency,
            } => write!(
                f,
                "Currency mismatch: debit {} != credit {}",
                debit_currency, credit_currency
            ),
        }
    }
}

impl std::error::Error for EntryPairError {}
