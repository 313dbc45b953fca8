use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format, selected via the LOG_FORMAT environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl From<&str> for LogFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initializes the tracing subscriber. RUST_LOG overrides the configured
/// level.
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
            .init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }

    tracing::info!(level, ?format, "logging initialized");
}

/// Number of leading reference characters that survive masking.
const REFERENCE_PREFIX: usize = 4;

/// Client-supplied transfer references often embed order or player
/// identifiers, so log lines carry only a correlation prefix and the
/// length, never the full value.
pub fn mask_reference(reference: &str) -> String {
    let total = reference.chars().count();
    if total <= REFERENCE_PREFIX {
        return format!("<ref:{} chars>", total);
    }

    let prefix: String = reference.chars().take(REFERENCE_PREFIX).collect();
    format!("{}..<{} chars>", prefix, total)
}
