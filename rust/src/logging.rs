//! Logging setup for the `source-framework` binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "source_framework=warn";
const VERBOSE_LOG_FILTER: &str = "source_framework=debug";

/// Install a stderr subscriber. `RUST_LOG` wins over `verbose`.
///
/// Calling this twice is harmless; the second subscriber is not installed.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init();
}
