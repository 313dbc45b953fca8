use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Account, AccountKind, Currency, EntryKind, LedgerEntry, TransactionKind, TransactionRecord,
};
use crate::services::{AccountLedgerPage, AccountStatement, TransactionHistory};

/// Account DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub account_type: AccountKind,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_type: account.account_kind,
            currency: account.currency,
            created_at: account.created_at,
        }
    }
}

/// Balance DTO; the balance is always derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: Uuid,
    pub currency: Currency,
    pub balance: Decimal,
}

/// Transaction header DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub transaction_type: TransactionKind,
    pub currency: Currency,
    pub reference_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<TransactionRecord> for TransactionResponse {
    fn from(tx: TransactionRecord) -> Self {
        Self {
            id: tx.id,
            from_account_id: tx.from_account_id,
            to_account_id: tx.to_account_id,
            amount: tx.amount,
            transaction_type: tx.transaction_kind,
            currency: tx.currency,
            reference_id: tx.reference,
            timestamp: tx.created_at,
        }
    }
}

/// Ledger entry DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_id: Uuid,
    pub entry_type: EntryKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            account_id: entry.account_id,
            transaction_id: entry.transaction_id,
            entry_type: entry.entry_kind,
            amount: entry.amount,
            currency: entry.currency,
            description: entry.description,
            timestamp: entry.created_at,
        }
    }
}

/// Transaction header plus its ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHistoryResponse {
    pub transaction: TransactionResponse,
    pub entries: Vec<LedgerEntryResponse>,
}

impl From<TransactionHistory> for TransactionHistoryResponse {
    fn from(history: TransactionHistory) -> Self {
        Self {
            transaction: history.transaction.into(),
            entries: history.entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// One ledger page row: an entry with its running balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerLineResponse {
    #[serde(flatten)]
    pub entry: LedgerEntryResponse,
    pub running_balance: Decimal,
}

/// Page metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_size: i64,
    pub page_number: i64,
    pub total_entries: i64,
}

/// Paginated account ledger with per-entry running balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLedgerResponse {
    pub account_id: Uuid,
    pub currency: Currency,
    pub balance: Decimal,
    pub entries: Vec<LedgerLineResponse>,
    pub page: PageInfo,
}

impl From<AccountLedgerPage> for AccountLedgerResponse {
    fn from(page: AccountLedgerPage) -> Self {
        Self {
            account_id: page.account_id,
            currency: page.currency,
            balance: page.balance,
            entries: page
                .lines
                .into_iter()
                .map(|line| LedgerLineResponse {
                    entry: line.entry.into(),
                    running_balance: line.running_balance,
                })
                .collect(),
            page: PageInfo {
                page_size: page.page_size,
                page_number: page.page_number,
                total_entries: page.total_entries,
            },
        }
    }
}

/// One statement row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementLineResponse {
    pub transaction_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub is_credit: bool,
}

/// Period statement for an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatementResponse {
    pub account_id: Uuid,
    pub currency: Currency,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub opening_balance: Decimal,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub closing_balance: Decimal,
    pub transaction_count: i64,
    pub entries: Vec<StatementLineResponse>,
}

impl From<AccountStatement> for AccountStatementResponse {
    fn from(statement: AccountStatement) -> Self {
        Self {
            account_id: statement.account_id,
            currency: statement.currency,
            start_date: statement.period_start,
            end_date: statement.period_end,
            opening_balance: statement.opening_balance,
            total_debits: statement.total_debits,
            total_credits: statement.total_credits,
            closing_balance: statement.closing_balance,
            transaction_count: statement.transaction_count,
            entries: statement
                .lines
                .into_iter()
                .map(|line| StatementLineResponse {
                    transaction_id: line.transaction_id,
                    timestamp: line.timestamp,
                    description: line.description,
                    amount: line.amount,
                    is_credit: line.is_credit,
                })
                .collect(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: bool,
}
