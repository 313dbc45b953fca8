use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Currency;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application error taxonomy. Deterministic rejections carry enough context
/// for the caller to act on; store-level failures stay opaque.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Account '{0}' not found")]
    AccountNotFound(Uuid),

    #[error("Transaction '{0}' not found")]
    TransactionNotFound(Uuid),

    #[error("Insufficient funds on account '{account_id}': required {required}, available {available}")]
    InsufficientFunds {
        account_id: Uuid,
        required: Decimal,
        available: Decimal,
    },

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: Currency,
        actual: Currency,
    },

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Reference '{0}' is already used by another transaction")]
    DuplicateReference(String),

    #[error("Balance verification failed for account '{account_id}': expected {expected}, derived {actual}")]
    BalanceVerification {
        account_id: Uuid,
        expected: Decimal,
        actual: Decimal,
    },

    #[error("Transient failure, retry later: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AccountNotFound(_) | AppError::TransactionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InsufficientFunds { .. }
            | AppError::CurrencyMismatch { .. }
            | AppError::InvalidTransaction(_)
            | AppError::DuplicateReference(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BalanceVerification { .. }
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Retryable at the engine level. Deterministic rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }
}

/// Wire shape of an error: `{status, message, timestamp}` plus a field map
/// for request validation failures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, String>>,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now(),
            field_errors: None,
        }
    }

    pub fn with_field_errors(mut self, field_errors: BTreeMap<String, String>) -> Self {
        self.field_errors = Some(field_errors);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal causes are logged, not leaked.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {}", e);
                "An internal error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody::new(status, message))).into_response()
    }
}
