use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::api::requests::{
    CreateAccountRequest, CreateTransferRequest, LedgerPageQuery, ListEntriesQuery, StatementQuery,
};
use crate::api::responses::{
    AccountLedgerResponse, AccountResponse, AccountStatementResponse, BalanceResponse,
    HealthResponse, LedgerEntryResponse, TransactionHistoryResponse, TransactionResponse,
};
use crate::api::routes::AppState;
use crate::error::{AppError, ErrorBody};
use crate::repositories::{LedgerRepository, TransactionRepository};
use crate::services::{
    AccountService, BalanceService, ReportingService, TransferCommand, TransferEngine,
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

fn validation_failure(field_errors: BTreeMap<String, String>) -> Response {
    let body = ErrorBody::new(StatusCode::BAD_REQUEST, "Request validation failed")
        .with_field_errors(field_errors);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn not_found(message: impl Into<String>) -> Response {
    let body = ErrorBody::new(StatusCode::NOT_FOUND, message);
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

// ============================================================================
// Operational endpoints
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    Json(HealthResponse {
        status: if db_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        database: db_healthy,
    })
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ============================================================================
// Account handlers
// ============================================================================

/// POST /accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), Response> {
    let (currency, account_kind) = request.validate().map_err(validation_failure)?;

    let account = AccountService::new(state.pool.clone())
        .create_account(account_kind, currency)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// GET /accounts/:id/balance
pub async fn get_account_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = AccountService::new(state.pool.clone()).get_account(id).await?;
    let balance = BalanceService::new(state.pool.clone()).balance(id).await?;

    Ok(Json(BalanceResponse {
        account_id: account.id,
        currency: account.currency,
        balance,
    }))
}

/// GET /accounts/:id/transactions
pub async fn get_account_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let account_service = AccountService::new(state.pool.clone());
    if !account_service.exists(id).await? {
        return Err(AppError::AccountNotFound(id));
    }

    let transactions = TransactionRepository::new(state.pool.clone())
        .find_by_account(id)
        .await?;

    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

/// GET /accounts/:id/ledger-entries
pub async fn get_account_ledger_entries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<Vec<LedgerEntryResponse>>, AppError> {
    let account_service = AccountService::new(state.pool.clone());
    if !account_service.exists(id).await? {
        return Err(AppError::AccountNotFound(id));
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let entries = LedgerRepository::new(state.pool.clone())
        .find_by_account(id, limit, offset, None)
        .await?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Transfer handlers
// ============================================================================

/// POST /transfers
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Json<TransactionResponse>, Response> {
    request.validate().map_err(validation_failure)?;

    let mut command = TransferCommand::transfer(
        request.from_account_id,
        request.to_account_id,
        request.amount,
    );
    if let Some(reference) = request.reference_id {
        command = command.with_reference(reference);
    }

    let transaction = TransferEngine::with_config(state.pool.clone(), state.transfer.clone())
        .transfer(command)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(transaction.into()))
}

/// GET /transactions/reference/:ref
pub async fn get_transaction_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<TransactionResponse>, Response> {
    let transaction = TransactionRepository::new(state.pool.clone())
        .find_by_reference_ci(&reference)
        .await
        .map_err(IntoResponse::into_response)?
        .ok_or_else(|| {
            not_found(format!("Transaction with reference '{}' not found", reference))
        })?;

    Ok(Json(transaction.into()))
}

/// GET /transactions/:id/ledger-entries
pub async fn get_transaction_ledger_entries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LedgerEntryResponse>>, AppError> {
    let transaction_repo = TransactionRepository::new(state.pool.clone());
    if transaction_repo.find_by_id(id).await?.is_none() {
        return Err(AppError::TransactionNotFound(id));
    }

    let entries = LedgerRepository::new(state.pool.clone())
        .find_by_transaction(id)
        .await?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Reporting handlers
// ============================================================================

/// GET /reports/transactions/:id
pub async fn report_transaction_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionHistoryResponse>, AppError> {
    let history = ReportingService::new(state.pool.clone())
        .transaction_history(id)
        .await?;

    Ok(Json(history.into()))
}

/// GET /reports/accounts/:id/ledger?pageSize&pageNumber
pub async fn report_account_ledger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LedgerPageQuery>,
) -> Result<Json<AccountLedgerResponse>, AppError> {
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page_number = query.page_number.unwrap_or(0).max(0);

    let page = ReportingService::new(state.pool.clone())
        .account_ledger(id, page_size, page_number)
        .await?;

    Ok(Json(page.into()))
}

/// GET /reports/accounts/:id/statement?startDate&endDate
pub async fn report_account_statement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatementQuery>,
) -> Result<Json<AccountStatementResponse>, Response> {
    if query.end_date < query.start_date {
        let mut errors = BTreeMap::new();
        errors.insert(
            "endDate".to_string(),
            "endDate must not precede startDate".to_string(),
        );
        return Err(validation_failure(errors));
    }

    let statement = ReportingService::new(state.pool.clone())
        .account_statement(id, query.start_date, query.end_date)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(statement.into()))
}
