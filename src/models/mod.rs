pub mod account;
pub mod currency;
pub mod ledger_entry;
pub mod transaction;

pub use account::{Account, AccountKind, DebitPolicy};
pub use currency::Currency;
pub use ledger_entry::{EntryKind, EntryPair, LedgerEntry};
pub use transaction::{TransactionKind, TransactionRecord};
