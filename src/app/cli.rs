use crate::config::{ConfigError, ConfigOverrides};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Ship NDJSON log entries from stdin to an HTTP log intake.
///
/// Flags take precedence over `--config-file`, which takes precedence over
/// the `RASK_LOGGING_HTTP_*` environment variables.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Destination URL (http or https)
    #[arg(long)]
    pub url: Option<String>,

    /// Entries per batch (1-1000)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Flush interval in milliseconds
    #[arg(long)]
    pub flush_interval: Option<u64>,

    /// Per-request timeout in milliseconds (1000-300000)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Delivery attempts per flush
    #[arg(long)]
    pub retries: Option<u32>,

    /// Base retry delay in milliseconds, doubled after every attempt
    #[arg(long)]
    pub retry_delay: Option<u64>,

    /// Request header as KEY=VALUE; repeat for more. Replaces the default set.
    #[arg(long = "header", value_name = "KEY=VALUE", value_parser = parse_header_arg)]
    pub headers: Vec<(String, String)>,

    /// HTTP method
    #[arg(long)]
    pub method: Option<String>,

    /// Send only the essential fields of every entry
    #[arg(long)]
    pub minimal: bool,

    /// Drop metadata in minimal scope
    #[arg(long)]
    pub no_metadata: bool,

    /// TOML configuration file
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Log level of the transport's own diagnostics
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Flags as an overrides layer; unset flags leave lower layers alone.
    pub fn overrides(&self) -> ConfigOverrides {
        let headers = (!self.headers.is_empty())
            .then(|| self.headers.iter().cloned().collect::<BTreeMap<_, _>>());

        ConfigOverrides {
            url: self.url.clone(),
            batch_size: self.batch_size,
            flush_interval: self.flush_interval,
            timeout: self.timeout,
            retries: self.retries,
            retry_delay: self.retry_delay,
            headers,
            method: self.method.clone(),
            minimal: self.minimal.then_some(true),
            include_metadata: self.no_metadata.then_some(false),
        }
    }

    /// The config file layer with the flags on top.
    pub fn explicit_layer(&self) -> Result<ConfigOverrides, ConfigError> {
        let file = match &self.config_file {
            Some(path) => ConfigOverrides::from_file(path)?,
            None => ConfigOverrides::default(),
        };
        Ok(file.merge(self.overrides()))
    }
}

fn parse_header_arg(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err("header name must not be empty".to_string());
    }
    Ok((key.to_string(), value.trim().to_string()))
}
