use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Targets that are noisy below `warn`.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("Failed to set global tracing subscriber: {0}")]
    AlreadyInitialized(String),
}

/// Builds the filter string: `RUST_LOG` when set, otherwise `level` with
/// the HTTP stack quieted.
pub fn build_filter_string(level: &str, rust_log: Option<&str>) -> String {
    if let Some(directives) = rust_log.filter(|s| !s.trim().is_empty()) {
        return directives.to_string();
    }

    let mut parts = Vec::with_capacity(QUIET_TARGETS.len() + 1);
    parts.push(level.to_lowercase());
    parts.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    parts.join(",")
}

/// Installs the global subscriber once. Later calls are no-ops.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    static INIT: OnceLock<()> = OnceLock::new();
    if INIT.get().is_some() {
        return Ok(());
    }

    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter_string(level, rust_log.as_deref());
    let env_filter =
        EnvFilter::try_new(&filter).map_err(|source| LoggingError::InvalidFilter {
            filter: filter.clone(),
            source,
        })?;

    // Diagnostics go to stderr so stdout stays free for the stats summary.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    let _ = INIT.set(());
    Ok(())
}
