use crate::error::{AppError, Result};
use crate::models::{EntryPair, LedgerEntry, TransactionKind, TransactionRecord};
use crate::repositories::{AccountRepository, LedgerRepository, TransactionRepository};
use crate::services::validation::TransferValidator;
use anyhow::anyhow;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

/// A transfer request as the engine sees it. Currency is not part of the
/// command; it is a property of the (immutable) account pair.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub kind: TransactionKind,
    pub description: Option<String>,
    /// Upper bound on the whole attempt including retries. On expiry the
    /// in-flight transaction is rolled back and `Transient` is surfaced.
    pub deadline: Option<Duration>,
}

impl TransferCommand {
    pub fn transfer(from_account_id: Uuid, to_account_id: Uuid, amount: Decimal) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
            reference: None,
            kind: TransactionKind::Transfer,
            description: None,
            deadline: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Tuning knobs for the engine's locking and retry behavior.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub lock_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            max_retries: 2,
            retry_backoff: Duration::from_millis(25),
        }
    }
}

/// Progress of a single transfer attempt. `Committed` and the
/// short-circuited duplicate are the only success terminals; every
/// rejection is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Received,
    Validating,
    Locked,
    Written,
    Committed,
    Rejected,
}

impl TransferState {
    pub fn valid_transitions(self) -> &'static [TransferState] {
        match self {
            TransferState::Received => &[TransferState::Validating, TransferState::Rejected],
            TransferState::Validating => &[TransferState::Locked, TransferState::Rejected],
            TransferState::Locked => &[TransferState::Written, TransferState::Rejected],
            TransferState::Written => &[TransferState::Committed, TransferState::Rejected],
            TransferState::Committed | TransferState::Rejected => &[],
        }
    }

    pub fn can_transition(self, to: TransferState) -> bool {
        self.valid_transitions().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// The transfer engine: orchestrates a value movement as one ACID
/// transaction writing a balanced debit/credit pair, with canonical-order
/// row locks for deadlock freedom and reference idempotency for safe
/// retries.
pub struct TransferEngine {
    pool: PgPool,
    account_repo: AccountRepository,
    transaction_repo: TransactionRepository,
    ledger_repo: LedgerRepository,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, TransferConfig::default())
    }

    pub fn with_config(pool: PgPool, config: TransferConfig) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            transaction_repo: TransactionRepository::new(pool.clone()),
            ledger_repo: LedgerRepository::new(pool.clone()),
            pool,
            config,
        }
    }

    /// Executes a transfer. With a reference the call is idempotent: any
    /// number of identical invocations yields the same transaction header.
    pub async fn transfer(&self, command: TransferCommand) -> Result<TransactionRecord> {
        match command.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.transfer_inner(&command))
                .await
                .map_err(|_| AppError::Transient("transfer deadline exceeded".to_string()))?,
            None => self.transfer_inner(&command).await,
        }
    }

    async fn transfer_inner(&self, command: &TransferCommand) -> Result<TransactionRecord> {
        TransferValidator::validate_request(
            command.from_account_id,
            command.to_account_id,
            command.amount,
        )
        .inspect_err(|_| Self::record_outcome("rejected"))?;

        // Idempotency short-circuit before opening a write transaction.
        if let Some(reference) = &command.reference {
            if let Some(existing) = self.find_existing_for_reference(reference, command).await? {
                tracing::info!(
                    transaction_id = %existing.id,
                    reference = %crate::observability::mask_reference(reference),
                    "transfer short-circuited by reference"
                );
                Self::record_outcome("short_circuited");
                return Ok(existing);
            }
        }

        let mut attempt = 0u32;
        loop {
            match self.execute_once(command).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    metrics::counter!("wallet_transfer_retries_total").increment(1);
                    tracing::warn!(attempt, "transient transfer failure, retrying: {}", e);
                    tokio::time::sleep(self.config.retry_backoff * attempt + Self::jitter()).await;
                }
                Ok(transaction) => {
                    Self::record_outcome("committed");
                    return Ok(transaction);
                }
                Err(e) => {
                    Self::record_outcome(if e.is_transient() { "transient" } else { "rejected" });
                    return Err(e);
                }
            }
        }
    }

    /// One attempt under a single database transaction.
    async fn execute_once(&self, command: &TransferCommand) -> Result<TransactionRecord> {
        let mut state = TransferState::Received;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Self::map_store_error(AppError::Database(e)))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.config.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        debug_assert!(state.can_transition(TransferState::Validating));
        state = TransferState::Validating;

        // Canonical lock order: ascending byte-wise UUID comparison. This is
        // the sole deadlock-avoidance mechanism for opposing transfers.
        let mut lock_order = vec![command.from_account_id, command.to_account_id];
        lock_order.sort_unstable();
        lock_order.dedup();

        let locked = self
            .account_repo
            .lock_in_order(&mut tx, &lock_order)
            .await
            .map_err(Self::map_store_error)?;

        debug_assert!(state.can_transition(TransferState::Locked));
        state = TransferState::Locked;

        let from_account = locked
            .iter()
            .find(|a| a.id == command.from_account_id)
            .ok_or(AppError::AccountNotFound(command.from_account_id))?;
        let to_account = locked
            .iter()
            .find(|a| a.id == command.to_account_id)
            .ok_or(AppError::AccountNotFound(command.to_account_id))?;

        // Balance derived inside the transaction; the row locks make this a
        // consistent snapshot of the source account's ledger.
        let from_balance = self
            .ledger_repo
            .signed_sum_on(&mut tx, from_account.id)
            .await
            .map_err(Self::map_store_error)?;

        TransferValidator::validate(from_account, to_account, command.amount, from_balance)?;

        let header = TransactionRecord::new(
            from_account.id,
            to_account.id,
            command.amount,
            command.kind,
            from_account.currency,
            command.reference.clone(),
        );

        let mut debit = LedgerEntry::debit(
            header.id,
            from_account.id,
            command.amount,
            from_account.currency,
        );
        let mut credit = LedgerEntry::credit(
            header.id,
            to_account.id,
            command.amount,
            to_account.currency,
        );
        if let Some(description) = &command.description {
            debit = debit.with_description(description.clone());
            credit = credit.with_description(description.clone());
        }
        let pair = EntryPair::new(debit, credit).map_err(|e| AppError::Internal(anyhow!(e)))?;

        debug_assert!(state.can_transition(TransferState::Written));
        state = TransferState::Written;

        let entries = [pair.debit, pair.credit];
        match self
            .transaction_repo
            .insert_with_entries(&mut tx, &header, &entries)
            .await
        {
            Ok(persisted) => {
                tx.commit()
                    .await
                    .map_err(|e| Self::map_store_error(AppError::Database(e)))?;

                debug_assert!(state.can_transition(TransferState::Committed));
                tracing::info!(
                    transaction_id = %persisted.id,
                    from = %persisted.from_account_id,
                    to = %persisted.to_account_id,
                    kind = ?persisted.transaction_kind,
                    "transfer committed"
                );
                Ok(persisted)
            }
            Err(AppError::DuplicateReference(reference)) => {
                // A concurrent writer claimed the reference between the
                // short-circuit check and the insert. Roll back and re-run
                // the reference check; identical parameters still succeed.
                drop(tx);
                match self.find_existing_for_reference(&reference, command).await? {
                    Some(existing) => Ok(existing),
                    None => Err(AppError::DuplicateReference(reference)),
                }
            }
            Err(e) => Err(Self::map_store_error(e)),
        }
    }

    /// Consults the reference index. An existing transaction with identical
    /// (from, to, amount) satisfies the request; currency is a function of
    /// the account pair, so it agrees as well. A mismatch is a hard
    /// rejection.
    async fn find_existing_for_reference(
        &self,
        reference: &str,
        command: &TransferCommand,
    ) -> Result<Option<TransactionRecord>> {
        let Some(existing) = self.transaction_repo.find_by_reference_ci(reference).await? else {
            return Ok(None);
        };

        if existing.matches_request(
            command.from_account_id,
            command.to_account_id,
            command.amount,
            existing.currency,
        ) {
            Ok(Some(existing))
        } else {
            Err(AppError::InvalidTransaction(format!(
                "reference '{}' was already used with different parameters",
                reference
            )))
        }
    }

    /// Lock-wait timeouts, deadlocks, and serialization failures are
    /// retryable; everything else from the store is not.
    fn map_store_error(e: AppError) -> AppError {
        if let AppError::Database(sqlx::Error::Database(db)) = &e {
            match db.code().as_deref() {
                Some("55P03") => return AppError::Transient("lock wait timeout".to_string()),
                Some("40P01") => return AppError::Transient("deadlock detected".to_string()),
                Some("40001") => {
                    return AppError::Transient("serialization failure".to_string())
                }
                _ => {}
            }
        }
        e
    }

    fn jitter() -> Duration {
        Duration::from_millis((Uuid::new_v4().as_u128() % 16) as u64)
    }

    fn record_outcome(outcome: &'static str) {
        metrics::counter!("wallet_transfers_total", "outcome" => outcome).increment(1);
    }
}
