use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{AccountKind, Currency};

/// Request to create a new account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub currency: String,
    pub account_type: String,
}

impl CreateAccountRequest {
    /// Parses the request into domain values, collecting per-field errors.
    pub fn validate(&self) -> Result<(Currency, AccountKind), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();

        let currency = match Currency::from_str(&self.currency) {
            Ok(c) => Some(c),
            Err(e) => {
                errors.insert("currency".to_string(), e.to_string());
                None
            }
        };
        let account_type = match AccountKind::from_str(&self.account_type) {
            Ok(k) => Some(k),
            Err(e) => {
                errors.insert("accountType".to_string(), e);
                None
            }
        };

        match (currency, account_type) {
            (Some(c), Some(k)) if errors.is_empty() => Ok((c, k)),
            _ => Err(errors),
        }
    }
}

/// Request to execute a transfer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub reference_id: Option<String>,
}

impl CreateTransferRequest {
    pub fn validate(&self) -> Result<(), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();

        if self.amount <= Decimal::ZERO {
            errors.insert("amount".to_string(), "amount must be positive".to_string());
        }
        if self.from_account_id == self.to_account_id {
            errors.insert(
                "toAccountId".to_string(),
                "source and destination accounts must be different".to_string(),
            );
        }
        if let Some(reference) = &self.reference_id {
            if reference.trim().is_empty() {
                errors.insert(
                    "referenceId".to_string(),
                    "referenceId must not be blank".to_string(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Query parameters for the paginated account ledger report.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPageQuery {
    pub page_size: Option<i64>,
    pub page_number: Option<i64>,
}

/// Query parameters for the account statement report (ISO-8601 instants).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Query parameters for listing an account's raw ledger entries.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_account_request_validation() {
        let valid = CreateAccountRequest {
            currency: "EUR".to_string(),
            account_type: "MAIN".to_string(),
        };
        assert_eq!(valid.validate().unwrap(), (Currency::EUR, AccountKind::Main));

        let invalid = CreateAccountRequest {
            currency: "XYZ".to_string(),
            account_type: "SAVINGS".to_string(),
        };
        let errors = invalid.validate().unwrap_err();
        assert!(errors.contains_key("currency"));
        assert!(errors.contains_key("accountType"));
    }

    #[test]
    fn test_create_transfer_request_validation() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();

        let valid = CreateTransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount: dec!(100.00),
            reference_id: Some("r1".to_string()),
        };
        assert!(valid.validate().is_ok());

        let non_positive = CreateTransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount: dec!(0),
            reference_id: None,
        };
        assert!(non_positive.validate().unwrap_err().contains_key("amount"));

        let same_account = CreateTransferRequest {
            from_account_id: from,
            to_account_id: from,
            amount: dec!(10),
            reference_id: None,
        };
        assert!(same_account.validate().unwrap_err().contains_key("toAccountId"));

        let blank_reference = CreateTransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount: dec!(10),
            reference_id: Some("  ".to_string()),
        };
        assert!(blank_reference.validate().unwrap_err().contains_key("referenceId"));
    }

    #[test]
    fn test_transfer_request_deserializes_camel_case() {
        let json = r#"{
            "fromAccountId": "550e8400-e29b-41d4-a716-446655440000",
            "toAccountId": "550e8400-e29b-41d4-a716-446655440001",
            "amount": 300.00,
            "referenceId": "r1"
        }"#;

        let request: CreateTransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.amount, dec!(300.00));
        assert_eq!(request.reference_id.as_deref(), Some("r1"));
    }
}
