//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; the fallback keeps crate-level
/// debug output while silencing sqlx statement logging.
pub fn init(config: &LoggingConfig) {
    let default_directive = config
        .level
        .clone()
        .unwrap_or_else(|| "info,dexflow=debug,sqlx=warn".to_string());

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
