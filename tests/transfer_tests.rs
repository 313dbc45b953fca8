mod common;

use rust_decimal_macros::dec;
use std::time::Duration;
use uuid::Uuid;
use wallet_ledger::error::AppError;
use wallet_ledger::models::{AccountKind, Currency, EntryKind, TransactionKind};
use wallet_ledger::repositories::{LedgerRepository, TransactionRepository};
use wallet_ledger::services::{BalanceService, TransferCommand, TransferEngine};

async fn reference_count(pool: &sqlx::PgPool, reference: &str) -> i64 {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE LOWER(reference) = LOWER($1)")
            .bind(reference)
            .fetch_one(pool)
            .await
            .expect("Failed to count references");
    row.0
}

#[tokio::test]
async fn test_basic_transfer() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let transaction = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(300.00)).with_reference("r1"))
        .await
        .expect("Transfer failed");

    assert_eq!(transaction.from_account_id, a.id);
    assert_eq!(transaction.to_account_id, b.id);
    assert_eq!(transaction.amount, dec!(300.00));
    assert_eq!(transaction.transaction_kind, TransactionKind::Transfer);
    assert_eq!(transaction.currency, Currency::EUR);
    assert_eq!(transaction.reference.as_deref(), Some("r1"));

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(a.id).await.unwrap(), dec!(700.00));
    assert_eq!(balances.balance(b.id).await.unwrap(), dec!(300.00));

    let entries = LedgerRepository::new(pool.clone())
        .find_by_transaction(transaction.id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    let debit = entries.iter().find(|e| e.entry_kind == EntryKind::Debit).unwrap();
    let credit = entries.iter().find(|e| e.entry_kind == EntryKind::Credit).unwrap();
    assert_eq!(debit.account_id, a.id);
    assert_eq!(credit.account_id, b.id);
    assert_eq!(debit.amount, dec!(300.00));
    assert_eq!(credit.amount, dec!(300.00));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_idempotent_replay() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let command = TransferCommand::transfer(a.id, b.id, dec!(300.00)).with_reference("replay-1");

    let first = engine.transfer(command.clone()).await.expect("First transfer failed");
    let second = engine.transfer(command.clone()).await.expect("Replay failed");
    let third = engine.transfer(command).await.expect("Second replay failed");

    assert_eq!(first.id, second.id);
    assert_eq!(first.id, third.id);

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(a.id).await.unwrap(), dec!(700.00));
    assert_eq!(balances.balance(b.id).await.unwrap(), dec!(300.00));
    assert_eq!(reference_count(&pool, "replay-1").await, 1);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_replay_matches_reference_case_insensitively() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let first = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(100.00)).with_reference("Case-Ref"))
        .await
        .expect("Transfer failed");

    let replay = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(100.00)).with_reference("CASE-REF"))
        .await
        .expect("Case-variant replay failed");

    assert_eq!(first.id, replay.id);
    assert_eq!(reference_count(&pool, "case-ref").await, 1);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_reference_conflict_with_different_parameters() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(300.00)).with_reference("r1"))
        .await
        .expect("Transfer failed");

    let conflict = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(400.00)).with_reference("r1"))
        .await;
    assert!(matches!(conflict, Err(AppError::InvalidTransaction(_))));

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(a.id).await.unwrap(), dec!(700.00));
    assert_eq!(balances.balance(b.id).await.unwrap(), dec!(300.00));
    assert_eq!(reference_count(&pool, "r1").await, 1);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_insufficient_funds() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(50.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let result = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(100.00)))
        .await;

    match result {
        Err(AppError::InsufficientFunds {
            account_id,
            required,
            available,
        }) => {
            assert_eq!(account_id, a.id);
            assert_eq!(required, dec!(100.00));
            assert_eq!(available, dec!(50.00));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(a.id).await.unwrap(), dec!(50.00));
    assert_eq!(balances.balance(b.id).await.unwrap(), dec!(0));

    // The rejected attempt must leave no entries behind.
    let entries = LedgerRepository::new(pool.clone())
        .count_by_account(b.id)
        .await
        .unwrap();
    assert_eq!(entries, 0);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_currency_mismatch() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::USD).await;
    common::fund_account(&pool, &a, dec!(100.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let result = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(10.00)))
        .await;

    assert!(matches!(
        result,
        Err(AppError::CurrencyMismatch {
            expected: Currency::EUR,
            actual: Currency::USD,
        })
    ));

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(a.id).await.unwrap(), dec!(100.00));
    assert_eq!(balances.balance(b.id).await.unwrap(), dec!(0));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_same_account_transfer_rejected() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(100.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let result = engine
        .transfer(TransferCommand::transfer(a.id, a.id, dec!(10.00)))
        .await;

    assert!(matches!(result, Err(AppError::InvalidTransaction(_))));
    assert_eq!(
        BalanceService::new(pool.clone()).balance(a.id).await.unwrap(),
        dec!(100.00)
    );

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_missing_account_rejected() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(100.00)).await;
    let ghost = Uuid::new_v4();

    let engine = TransferEngine::new(pool.clone());
    let result = engine
        .transfer(TransferCommand::transfer(a.id, ghost, dec!(10.00)))
        .await;

    assert!(matches!(result, Err(AppError::AccountNotFound(id)) if id == ghost));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_bonus_account_cannot_be_debited() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let bonus = common::create_account(&pool, AccountKind::Bonus, Currency::EUR).await;
    let main = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &bonus, dec!(500.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let result = engine
        .transfer(TransferCommand::transfer(bonus.id, main.id, dec!(1.00)))
        .await;

    // Denied regardless of the bonus balance.
    assert!(matches!(result, Err(AppError::InvalidTransaction(_))));
    assert_eq!(
        BalanceService::new(pool.clone()).balance(bonus.id).await.unwrap(),
        dec!(500.00)
    );

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_system_account_may_go_negative() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let system = common::create_account(&pool, AccountKind::System, Currency::EUR).await;
    let main = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;

    let engine = TransferEngine::new(pool.clone());
    engine
        .transfer(
            TransferCommand::transfer(system.id, main.id, dec!(1000.00))
                .with_kind(TransactionKind::Deposit),
        )
        .await
        .expect("Funding transfer failed");

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(system.id).await.unwrap(), dec!(-1000.00));
    assert_eq!(balances.balance(main.id).await.unwrap(), dec!(1000.00));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_opposing_concurrent_transfers() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;
    common::fund_account(&pool, &b, dec!(1000.00)).await;

    let pool_ab = pool.clone();
    let pool_ba = pool.clone();
    let (a_id, b_id) = (a.id, b.id);

    let ab = tokio::spawn(async move {
        TransferEngine::new(pool_ab)
            .transfer(
                TransferCommand::transfer(a_id, b_id, dec!(100.00))
                    .with_deadline(Duration::from_secs(10)),
            )
            .await
    });
    let ba = tokio::spawn(async move {
        TransferEngine::new(pool_ba)
            .transfer(
                TransferCommand::transfer(b_id, a_id, dec!(100.00))
                    .with_deadline(Duration::from_secs(10)),
            )
            .await
    });

    let (ab, ba) = (ab.await.unwrap(), ba.await.unwrap());
    assert!(ab.is_ok(), "A->B failed: {:?}", ab);
    assert!(ba.is_ok(), "B->A failed: {:?}", ba);

    // Canonical lock ordering means neither direction can deadlock, and the
    // pair's total is conserved.
    let balances = BalanceService::new(pool.clone());
    let total = balances.balance(a.id).await.unwrap() + balances.balance(b.id).await.unwrap();
    assert_eq!(total, dec!(2000.00));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_concurrent_transfers_with_same_reference() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let task_pool = pool.clone();
        let (a_id, b_id) = (a.id, b.id);
        handles.push(tokio::spawn(async move {
            TransferEngine::new(task_pool)
                .transfer(
                    TransferCommand::transfer(a_id, b_id, dec!(250.00)).with_reference("race-1"),
                )
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let result = handle.await.unwrap().expect("Racing transfer failed");
        ids.push(result.id);
    }

    // Exactly one transaction wins; every racer observes it.
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(reference_count(&pool, "race-1").await, 1);

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(a.id).await.unwrap(), dec!(750.00));
    assert_eq!(balances.balance(b.id).await.unwrap(), dec!(250.00));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_transfer_zero_sum_invariant() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::GBP).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::GBP).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let transaction = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(123.4567)))
        .await
        .expect("Transfer failed");

    let balances = BalanceService::new(pool.clone());
    assert!(balances
        .verify_transaction_zero_sum(transaction.id)
        .await
        .unwrap());
    assert_eq!(
        balances.verify_account_balance(a.id).await.unwrap(),
        dec!(876.5433)
    );

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_elapsed_deadline_surfaces_transient() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let result = engine
        .transfer(
            TransferCommand::transfer(a.id, b.id, dec!(100.00))
                .with_deadline(Duration::from_millis(0)),
        )
        .await;

    assert!(matches!(result, Err(AppError::Transient(_))));

    // A rolled-back attempt leaves no trace.
    assert_eq!(
        BalanceService::new(pool.clone()).balance(a.id).await.unwrap(),
        dec!(1000.00)
    );

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_transfer_without_reference_is_not_deduplicated() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let first = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(100.00)))
        .await
        .expect("First transfer failed");
    let second = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(100.00)))
        .await
        .expect("Second transfer failed");

    assert_ne!(first.id, second.id);

    let balances = BalanceService::new(pool.clone());
    assert_eq!(balances.balance(a.id).await.unwrap(), dec!(800.00));
    assert_eq!(balances.balance(b.id).await.unwrap(), dec!(200.00));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_transaction_lookup_by_reference() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let a = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    let b = common::create_account(&pool, AccountKind::Main, Currency::EUR).await;
    common::fund_account(&pool, &a, dec!(1000.00)).await;

    let engine = TransferEngine::new(pool.clone());
    let transaction = engine
        .transfer(TransferCommand::transfer(a.id, b.id, dec!(300.00)).with_reference("Lookup-Me"))
        .await
        .expect("Transfer failed");

    let repo = TransactionRepository::new(pool.clone());
    let found = repo
        .find_by_reference_ci("lookup-me")
        .await
        .unwrap()
        .expect("Reference lookup failed");
    assert_eq!(found.id, transaction.id);

    assert!(repo.find_by_reference_ci("unknown-ref").await.unwrap().is_none());

    common::cleanup_test_data(&pool).await;
}
