use axum::{
    routing::{get, post},
    Router,
};
use http::HeaderName;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

use super::handlers;
use crate::services::TransferConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub transfer: TransferConfig,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(pool: PgPool, transfer: TransferConfig) -> Self {
        Self {
            pool,
            transfer,
            metrics_handle: None,
        }
    }

    /// Adds the Prometheus handle rendered by the /metrics endpoint.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // Account endpoints
        .route("/accounts", post(handlers::create_account))
        .route("/accounts/:id/balance", get(handlers::get_account_balance))
        .route(
            "/accounts/:id/transactions",
            get(handlers::get_account_transactions),
        )
        .route(
            "/accounts/:id/ledger-entries",
            get(handlers::get_account_ledger_entries),
        )
        // Transfer endpoints
        .route("/transfers", post(handlers::create_transfer))
        .route(
            "/transactions/reference/:ref",
            get(handlers::get_transaction_by_reference),
        )
        .route(
            "/transactions/:id/ledger-entries",
            get(handlers::get_transaction_ledger_entries),
        )
        // Reporting endpoints
        .route(
            "/reports/transactions/:id",
            get(handlers::report_transaction_history),
        )
        .route(
            "/reports/accounts/:id/ledger",
            get(handlers::report_account_ledger),
        )
        .route(
            "/reports/accounts/:id/statement",
            get(handlers::report_account_statement),
        )
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .with_state(state)
}
