use super::env::overrides_from_env;
use super::{ConfigError, ConfigOverrides, TransportConfig};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Source of environment variables.
pub type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Merges defaults, the environment and explicit overrides into one
/// validated [`TransportConfig`].
pub struct ConfigResolver {
    env: Option<EnvLookup>,
    explicit: ConfigOverrides,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ConfigResolver {
    /// Reads the process environment and reports through `tracing`.
    pub fn new() -> Self {
        Self {
            env: Some(Box::new(|name| std::env::var(name).ok())),
            explicit: ConfigOverrides::default(),
            diagnostics: Arc::new(TracingSink),
        }
    }

    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Some(Box::new(lookup));
        self
    }

    /// Skips the environment layer entirely.
    pub fn without_env(mut self) -> Self {
        self.env = None;
        self
    }

    /// Adds an explicit layer on top of any explicit layer set before.
    pub fn with_explicit(mut self, overrides: ConfigOverrides) -> Self {
        self.explicit = std::mem::take(&mut self.explicit).merge(overrides);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn resolve(self) -> Result<TransportConfig, ConfigError> {
        let env_layer = match &self.env {
            Some(lookup) => overrides_from_env(lookup.as_ref(), self.diagnostics.as_ref())?,
            None => ConfigOverrides::default(),
        };

        let merged = ConfigOverrides::defaults()
            .merge(env_layer)
            .merge(self.explicit);

        let config = TransportConfig::try_from(merged)?;
        debug!(
            "Resolved HTTP transport config: url={}, batch_size={}, flush_interval={:?}, scope={}",
            config.url(),
            config.batch_size(),
            config.flush_interval(),
            config.scope().as_str()
        );
        Ok(config)
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("env", &self.env.is_some())
            .field("explicit", &self.explicit)
            .finish()
    }
}
