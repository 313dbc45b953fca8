use crate::error::{AppError, Result};
use crate::models::{Account, DebitPolicy};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Transfer validation over locked account rows and the freshly derived
/// source balance. Cheap request-shape checks run before any transaction is
/// opened; the balance-dependent checks run under the row locks.
pub struct TransferValidator;

impl TransferValidator {
    /// Pre-transaction checks: positivity and distinct endpoints. These need
    /// no store access and reject before a connection is taken.
    pub fn validate_request(
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidTransaction(
                "amount must be positive".to_string(),
            ));
        }
        if from_account_id == to_account_id {
            return Err(AppError::InvalidTransaction(
                "same-account transfer".to_string(),
            ));
        }
        Ok(())
    }

    /// In-transaction checks against the locked rows: currency agreement,
    /// the source kind's debit policy, and sufficient funds.
    pub fn validate(
        from: &Account,
        to: &Account,
        amount: Decimal,
        from_balance: Decimal,
    ) -> Result<()> {
        if from.currency != to.currency {
            return Err(AppError::CurrencyMismatch {
                expected: from.currency,
                actual: to.currency,
            });
        }

        match from.account_kind.debit_policy() {
            DebitPolicy::Denied => Err(AppError::InvalidTransaction(format!(
                "account kind {:?} does not permit debits",
                from.account_kind
            ))),
            DebitPolicy::Unbounded => Ok(()),
            DebitPolicy::Allowed => {
                if from_balance - amount < Decimal::ZERO {
                    Err(AppError::InsufficientFunds {
                        account_id: from.id,
                        required: amount,
                        available: from_balance,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}
