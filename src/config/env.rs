use super::{ConfigError, ConfigOverrides};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ENV_PREFIX: &str = "RASK_LOGGING_HTTP_";
pub const ENV_URL: &str = "RASK_LOGGING_HTTP_URL";
pub const ENV_BATCH_SIZE: &str = "RASK_LOGGING_HTTP_BATCH_SIZE";
pub const ENV_FLUSH_INTERVAL: &str = "RASK_LOGGING_HTTP_FLUSH_INTERVAL";
pub const ENV_TIMEOUT: &str = "RASK_LOGGING_HTTP_TIMEOUT";
pub const ENV_RETRIES: &str = "RASK_LOGGING_HTTP_RETRIES";
pub const ENV_RETRY_DELAY: &str = "RASK_LOGGING_HTTP_RETRY_DELAY";
pub const ENV_HEADERS: &str = "RASK_LOGGING_HTTP_HEADERS";
pub const ENV_METHOD: &str = "RASK_LOGGING_HTTP_METHOD";
pub const ENV_MINIMAL: &str = "RASK_LOGGING_HTTP_MINIMAL";
pub const ENV_INCLUDE_METADATA: &str = "RASK_LOGGING_HTTP_INCLUDE_METADATA";

/// Builds the environment layer. Unset and empty variables leave the field
/// untouched.
pub(super) fn overrides_from_env(
    lookup: &dyn Fn(&str) -> Option<String>,
    diagnostics: &dyn DiagnosticSink,
) -> Result<ConfigOverrides, ConfigError> {
    let mut overrides = ConfigOverrides::default();

    load_env_string(lookup, ENV_URL, &mut overrides.url);
    load_env_var(lookup, ENV_BATCH_SIZE, &mut overrides.batch_size)?;
    load_env_var(lookup, ENV_FLUSH_INTERVAL, &mut overrides.flush_interval)?;
    load_env_var(lookup, ENV_TIMEOUT, &mut overrides.timeout)?;
    load_env_var(lookup, ENV_RETRIES, &mut overrides.retries)?;
    load_env_var(lookup, ENV_RETRY_DELAY, &mut overrides.retry_delay)?;
    load_env_string(lookup, ENV_METHOD, &mut overrides.method);
    load_env_bool(lookup, ENV_MINIMAL, &mut overrides.minimal)?;
    load_env_bool(lookup, ENV_INCLUDE_METADATA, &mut overrides.include_metadata)?;

    // Malformed headers are tolerated: warn and keep the lower layer.
    if let Some(raw) = read(lookup, ENV_HEADERS) {
        match parse_headers(&raw) {
            Ok(headers) => overrides.headers = Some(headers),
            Err(reason) => diagnostics.report(Diagnostic::HeaderParseWarning {
                variable: ENV_HEADERS.to_string(),
                reason,
            }),
        }
    }

    Ok(overrides)
}

/// Parses a JSON object of header names to scalar values.
pub fn parse_headers(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let Value::Object(object) = value else {
        return Err("expected a JSON object".to_string());
    };

    object
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => Ok((name, s)),
            Value::Number(n) => Ok((name, n.to_string())),
            Value::Bool(b) => Ok((name, b.to_string())),
            _ => Err(format!("header '{name}' must be a string, number or boolean")),
        })
        .collect()
}

fn read(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn load_env_var<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
    target: &mut Option<T>,
) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = read(lookup, name) {
        let parsed = value
            .trim()
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
        *target = Some(parsed);
    }
    Ok(())
}

fn load_env_string(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
    target: &mut Option<String>,
) {
    if let Some(value) = read(lookup, name) {
        *target = Some(value);
    }
}

fn load_env_bool(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
    target: &mut Option<bool>,
) -> Result<(), ConfigError> {
    if let Some(value) = read(lookup, name) {
        let parsed = match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            other => {
                return Err(ConfigError::EnvError(format!(
                    "Invalid {name}: expected a boolean, got '{other}'"
                )));
            }
        };
        *target = Some(parsed);
    }
    Ok(())
}
