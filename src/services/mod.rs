pub mod account_service;
pub mod balance_service;
pub mod reporting_service;
pub mod transfer_engine;
pub mod validation;

pub use account_service::AccountService;
pub use balance_service::{BalanceService, StatementSummary};
pub use reporting_service::{
    AccountLedgerPage, AccountStatement, LedgerLine, ReportingService, StatementLine,
    TransactionHistory,
};
pub use transfer_engine::{TransferCommand, TransferConfig, TransferEngine, TransferState};
pub use validation::TransferValidator;
