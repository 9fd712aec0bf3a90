//! Configuration for handlers and links.
//!
//! # Example
//! ```rust,ignore
//! use orpc::{HandlerConfig, LinkConfig};
//! use std::time::Duration;
//!
//! let handler_config = HandlerConfig::new()
//!     .with_prefix("/rpc")
//!     .with_max_body_size(512 * 1024);
//! handler_config.validate()?;
//!
//! let link_config = LinkConfig::new("http://localhost:3000/rpc")
//!     .with_header("authorization", "Bearer token")
//!     .with_timeout(Duration::from_secs(10));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigValidationError {
    /// The prefix must start with `/` and must not end with one
    #[error("prefix must start with '/' and must not end with '/' (got: '{0}')")]
    InvalidPrefix(String),
    /// max_body_size must be greater than 0
    #[error("max_body_size must be greater than 0")]
    InvalidMaxBodySize,
    /// The link URL must be http(s)
    #[error("url must start with http:// or https:// (got: '{0}')")]
    InvalidUrl(String),
    /// timeout must be greater than 0
    #[error("timeout must be greater than 0")]
    InvalidTimeout,
    /// Header names must be non-empty
    #[error("header names must not be empty")]
    EmptyHeaderName,
}

/// Server handler configuration.
///
/// * `prefix` - URL prefix the handler owns, e.g. `/rpc`. Requests outside it
///   are reported as unmatched. Default: none.
/// * `max_body_size` - Largest accepted request body in bytes. Larger bodies
///   are answered with `PAYLOAD_TOO_LARGE`. Default: 1MB.
/// * `expose_internal_errors` - Send the real message of unexpected failures
///   instead of the generic one. Only for development. Default: false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// URL prefix (default: none)
    pub prefix: Option<String>,
    /// Maximum request body size in bytes (default: 1MB)
    pub max_body_size: usize,
    /// Expose messages of unexpected failures (default: false)
    pub expose_internal_errors: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            max_body_size: 1024 * 1024, // 1MB
            expose_internal_errors: false,
        }
    }
}

impl HandlerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the URL prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the maximum body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Expose messages of unexpected failures.
    pub fn with_expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `prefix` does not start with `/`, ends with `/`, or is just `/`
    /// - `max_body_size` is 0
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(prefix) = &self.prefix
            && (!prefix.starts_with('/') || prefix.ends_with('/'))
        {
            return Err(ConfigValidationError::InvalidPrefix(prefix.clone()));
        }
        if self.max_body_size == 0 {
            return Err(ConfigValidationError::InvalidMaxBodySize);
        }
        Ok(())
    }
}

/// Client link configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Base URL, e.g. `http://localhost:3000/rpc`
    pub url: String,
    /// Headers sent with every request
    pub headers: Vec<(String, String)>,
    /// Per-request timeout (default: none)
    #[serde(default, with = "duration_millis")]
    pub timeout: Option<Duration>,
}

impl LinkConfig {
    /// Create a configuration for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `url` without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s), the timeout is zero, or a
    /// header name is empty.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigValidationError::InvalidUrl(self.url.clone()));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if self.headers.iter().any(|(name, _)| name.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyHeaderName);
        }
        Ok(())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
