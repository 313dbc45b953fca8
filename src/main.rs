use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use wallet_ledger::api::{create_router, AppState};
use wallet_ledger::config::Settings;
use wallet_ledger::observability::{init_logging, init_metrics, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration first (needed for log level)
    let settings = Settings::new()?;

    let log_format = LogFormat::from(
        std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .as_str(),
    );
    init_logging(&settings.application.log_level, log_format);

    let metrics_handle = init_metrics()?;
    info!("Configuration loaded, metrics initialized");

    info!("Connecting to database at {}...", settings.database.url);
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;

    info!("Database connection established");

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    let state = AppState::new(pool, settings.transfer.engine_config()).with_metrics(metrics_handle);
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", settings.application.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
