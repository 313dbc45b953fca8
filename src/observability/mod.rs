pub mod logging;
pub mod metrics;

pub use logging::{init_logging, mask_reference, LogFormat};
pub use metrics::init_metrics;
