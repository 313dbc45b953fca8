use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the Prometheus recorder and registers metric descriptions.
/// The returned handle renders the scrape payload for the /metrics endpoint.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    metrics::describe_counter!(
        "wallet_transfers_total",
        "Transfer attempts by terminal outcome"
    );
    metrics::describe_counter!(
        "wallet_transfer_retries_total",
        "Transfer attempts retried after a transient store failure"
    );

    Ok(handle)
}
