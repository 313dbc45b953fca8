use crate::error::{AppError, Result};
use crate::models::{Currency, LedgerEntry, TransactionRecord};
use crate::repositories::{AccountRepository, LedgerRepository, TransactionRepository};
use crate::services::balance_service::{BalanceService, StatementSummary};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A transaction header together with all its ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub transaction: TransactionRecord,
    pub entries: Vec<LedgerEntry>,
}

/// One row of a paginated account ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLine {
    pub entry: LedgerEntry,
    pub running_balance: Decimal,
}

/// A page of an account's ledger with per-entry running balances. Entries
/// are ordered ascending within the page so the running balance is
/// well-defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLedgerPage {
    pub account_id: Uuid,
    pub currency: Currency,
    pub balance: Decimal,
    pub lines: Vec<LedgerLine>,
    pub page_size: i64,
    pub page_number: i64,
    pub total_entries: i64,
}

/// Per-entry summary row of an account statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLine {
    pub transaction_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub is_credit: bool,
}

/// Statement for an account over a period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatement {
    pub account_id: Uuid,
    pub currency: Currency,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub opening_balance: Decimal,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub closing_balance: Decimal,
    pub transaction_count: i64,
    pub lines: Vec<StatementLine>,
}

/// Read-only reporting views built directly over the ledger.
pub struct ReportingService {
    account_repo: AccountRepository,
    transaction_repo: TransactionRepository,
    ledger_repo: LedgerRepository,
    balance_service: BalanceService,
}

impl ReportingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            transaction_repo: TransactionRepository::new(pool.clone()),
            ledger_repo: LedgerRepository::new(pool.clone()),
            balance_service: BalanceService::new(pool),
        }
    }

    /// Header plus all entries for one transaction.
    pub async fn transaction_history(&self, transaction_id: Uuid) -> Result<TransactionHistory> {
        let transaction = self
            .transaction_repo
            .find_by_id(transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound(transaction_id))?;

        let entries = self.ledger_repo.find_by_transaction(transaction_id).await?;

        Ok(TransactionHistory {
            transaction,
            entries,
        })
    }

    /// Paginated account ledger with per-entry running balance. The page's
    /// opening balance is the signed sum of all entries before it in the
    /// ascending order.
    pub async fn account_ledger(
        &self,
        account_id: Uuid,
        page_size: i64,
        page_number: i64,
    ) -> Result<AccountLedgerPage> {
        if page_size <= 0 || page_number < 0 {
            return Err(AppError::InvalidTransaction(
                "pageSize must be positive and pageNumber non-negative".to_string(),
            ));
        }

        let account = self
            .account_repo
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?;

        let total_entries = self.ledger_repo.count_by_account(account_id).await?;
        let opening = self
            .ledger_repo
            .sum_before_offset(account_id, page_size * page_number)
            .await?;
        let entries = self
            .ledger_repo
            .find_page_by_account_asc(account_id, page_size, page_number)
            .await?;
        let balance = self.balance_service.balance(account_id).await?;

        let lines = BalanceService::running_balance(opening, &entries)
            .into_iter()
            .map(|(entry, running_balance)| LedgerLine {
                entry,
                running_balance,
            })
            .collect();

        Ok(AccountLedgerPage {
            account_id,
            currency: account.currency,
            balance,
            lines,
            page_size,
            page_number,
            total_entries,
        })
    }

    /// Period statement with per-entry transaction summaries.
    pub async fn account_statement(
        &self,
        account_id: Uuid,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
    ) -> Result<AccountStatement> {
        let account = self
            .account_repo
            .find_by_id(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?;

        let summary: StatementSummary = self.balance_service.statement(account_id, t0, t1).await?;

        let lines = summary
            .entries
            .iter()
            .map(|entry| StatementLine {
                transaction_id: entry.transaction_id,
                timestamp: entry.created_at,
                description: entry.description.clone(),
                amount: entry.amount,
                is_credit: entry.is_credit(),
            })
            .collect();

        Ok(AccountStatement {
            account_id,
            currency: account.currency,
            period_start: summary.period_start,
            period_end: summary.period_end,
            opening_balance: summary.opening_balance,
            total_debits: summary.total_debits,
            total_credits: summary.total_credits,
            closing_balance: summary.closing_balance,
            transaction_count: summary.transaction_count,
            lines,
        })
    }
}
