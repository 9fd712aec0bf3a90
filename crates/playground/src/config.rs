//! Server configuration from the environment

use anyhow::{Context as _, Result, bail};
use orpc::HandlerConfig;
use std::env;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3001;
/// Default prefix of the JSON/RPC profile
pub const DEFAULT_RPC_PREFIX: &str = "/rpc";
/// Default prefix of the REST contracts
pub const DEFAULT_API_PREFIX: &str = "/api";
/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Server configuration.
///
/// | variable | default |
/// |---|---|
/// | `PORT` | `3001` |
/// | `RPC_PREFIX` | `/rpc` |
/// | `API_PREFIX` | `/api` |
/// | `MAX_BODY_SIZE` | `1048576` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub rpc_prefix: String,
    pub api_prefix: String,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            rpc_prefix: DEFAULT_RPC_PREFIX.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            port: match lookup("PORT") {
                Some(port) => port.parse().with_context(|| format!("Invalid PORT '{}'", port))?,
                None => defaults.port,
            },
            rpc_prefix: lookup("RPC_PREFIX").unwrap_or(defaults.rpc_prefix),
            api_prefix: lookup("API_PREFIX").unwrap_or(defaults.api_prefix),
            max_body_size: match lookup("MAX_BODY_SIZE") {
                Some(size) => size
                    .parse()
                    .with_context(|| format!("Invalid MAX_BODY_SIZE '{}'", size))?,
                None => defaults.max_body_size,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that both profiles can be served side by side.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_prefix == self.api_prefix {
            bail!("RPC_PREFIX and API_PREFIX must differ, both are '{}'", self.rpc_prefix);
        }
        self.rpc_handler_config().validate()?;
        self.api_handler_config().validate()?;
        Ok(())
    }

    /// Configuration of the JSON/RPC handler
    pub fn rpc_handler_config(&self) -> HandlerConfig {
        HandlerConfig::new()
            .with_prefix(self.rpc_prefix.clone())
            .with_max_body_size(self.max_body_size)
    }

    /// Configuration of the REST handler
    pub fn api_handler_config(&self) -> HandlerConfig {
        HandlerConfig::new()
            .with_prefix(self.api_prefix.clone())
            .with_max_body_size(self.max_body_size)
    }
}
