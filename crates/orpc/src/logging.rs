//! Structured request logging
//!
//! [`logging_middleware`] logs every procedure call through `tracing` with a
//! time-ordered [`RequestId`], the call duration, and (optionally) the
//! redacted input and output. Calls slower than the configured threshold are
//! logged as warnings.
//!
//! ```rust,ignore
//! use orpc::logging::{LogConfig, logging_middleware};
//!
//! let pub_ = os().with_middleware(logging_middleware(
//!     LogConfig::new().with_input_logging(true).redact_field("pin"),
//! ));
//! ```

use crate::middleware::{MiddlewareFn, MiddlewareOptions, MiddlewareResult, Next};
use crate::{Context, RpcResult};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Length of [`RequestId::short`].
const SHORT_ID_LENGTH: usize = 8;

/// Default slow call threshold in milliseconds.
const DEFAULT_SLOW_THRESHOLD_MS: u64 = 1000;

/// Field names redacted by default (case-insensitive substring match).
const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "credential",
    "private_key",
    "privatekey",
    "ssn",
    "credit_card",
    "creditcard",
    "cvv",
];

/// Unique identifier for a request, used for log correlation.
///
/// UUID v7, so identifiers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(uuid::Uuid);

impl RequestId {
    /// Creates a new request ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
    }

    /// First characters of the ID, for compact log lines.
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(SHORT_ID_LENGTH).collect()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Log level for call logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything
    Trace,
    /// Development details
    Debug,
    /// Completed calls (default)
    #[default]
    Info,
    /// Slow or failed calls
    Warn,
    /// Failed calls only
    Error,
    /// Disabled
    Off,
}

/// Configuration for [`logging_middleware`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used for completed calls
    pub level: LogLevel,
    /// Log the redacted input
    pub log_input: bool,
    /// Log the redacted output
    pub log_output: bool,
    /// Field names to redact (lower-cased, substring match)
    pub redacted_fields: HashSet<String>,
    /// Replacement for redacted values
    pub redaction_replacement: String,
    /// Dotted paths that are never logged
    pub excluded_paths: HashSet<String>,
    /// Calls slower than this are logged as warnings
    pub slow_request_threshold_ms: Option<u64>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_input: false,
            log_output: false,
            redacted_fields: DEFAULT_SENSITIVE_FIELDS.iter().map(|s| s.to_string()).collect(),
            redaction_replacement: "[REDACTED]".to_string(),
            excluded_paths: HashSet::new(),
            slow_request_threshold_ms: Some(DEFAULT_SLOW_THRESHOLD_MS),
        }
    }
}

impl LogConfig {
    /// Creates a new logging configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level for completed calls.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets whether to log the (redacted) input.
    pub fn with_input_logging(mut self, enabled: bool) -> Self {
        self.log_input = enabled;
        self
    }

    /// Sets whether to log the (redacted) output.
    pub fn with_output_logging(mut self, enabled: bool) -> Self {
        self.log_output = enabled;
        self
    }

    /// Adds a field name to the redaction list.
    pub fn redact_field(mut self, field: impl Into<String>) -> Self {
        self.redacted_fields.insert(field.into().to_lowercase());
        self
    }

    /// Removes every redacted field, including the defaults.
    pub fn clear_redacted_fields(mut self) -> Self {
        self.redacted_fields.clear();
        self
    }

    /// Never log calls to `path` (dotted).
    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.excluded_paths.insert(path.into());
        self
    }

    /// Sets the slow call threshold; `None` disables slow call warnings.
    pub fn with_slow_threshold(mut self, threshold_ms: Option<u64>) -> Self {
        self.slow_request_threshold_ms = threshold_ms;
        self
    }

    /// Whether calls to `path` are logged at all.
    pub fn should_log_path(&self, path: &str) -> bool {
        self.level != LogLevel::Off && !self.excluded_paths.contains(path)
    }

    fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.redacted_fields.iter().any(|field| key.contains(field.as_str()))
    }

    fn is_slow(&self, duration: Duration) -> bool {
        self.slow_request_threshold_ms
            .is_some_and(|threshold| duration.as_millis() > u128::from(threshold))
    }
}

/// Replace the values of sensitive fields, at any depth.
pub fn redact_value(value: &Value, config: &LogConfig) -> Value {
    match value {
        Value::Object(map) => {
            let redacted: Map<String, Value> = map
                .iter()
                .map(|(key, val)| {
                    if config.is_sensitive(key) {
                        (key.clone(), Value::String(config.redaction_replacement.clone()))
                    } else {
                        (key.clone(), redact_value(val, config))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_value(v, config)).collect()),
        other => other.clone(),
    }
}

fn log_completed(level: LogLevel, request_id: &RequestId, path: &str, duration_ms: u64) {
    match level {
        LogLevel::Trace => trace!(request_id = %request_id, path = %path, duration_ms, "RPC call completed"),
        LogLevel::Debug => debug!(request_id = %request_id, path = %path, duration_ms, "RPC call completed"),
        LogLevel::Info => info!(request_id = %request_id, path = %path, duration_ms, "RPC call completed"),
        LogLevel::Warn | LogLevel::Error | LogLevel::Off => {}
    }
}

/// Creates a logging middleware with the given configuration.
///
/// The middleware passes the context through unchanged and never alters the
/// result.
pub fn logging_middleware(config: LogConfig) -> MiddlewareFn {
    let config = Arc::new(config);

    Arc::new(move |ctx: Context, options: MiddlewareOptions, next: Next| {
        let config = Arc::clone(&config);
        async move {
            let path = options.dotted_path();
            if !config.should_log_path(&path) {
                return next.proceed().await;
            }

            let request_id = RequestId::new();
            let start = Instant::now();

            if config.log_input {
                let input = redact_value(&options.input, &config);
                debug!(request_id = %request_id, path = %path, input = %input, "RPC call started");
            } else {
                debug!(request_id = %request_id, path = %path, "RPC call started");
            }

            let result: RpcResult<MiddlewareResult> = next.proceed().await;
            let duration = start.elapsed();
            let duration_ms = duration.as_millis() as u64;

            match &result {
                Ok(response) => {
                    if config.is_slow(duration) {
                        warn!(request_id = %request_id, path = %path, duration_ms, "Slow RPC call");
                    } else {
                        log_completed(config.level, &request_id, &path, duration_ms);
                    }
                    if config.log_output {
                        let output = redact_value(&response.output, &config);
                        debug!(request_id = %request_id, path = %path, output = %output, "RPC call output");
                    }
                }
                Err(e) if e.code().is_server_error() => {
                    error!(
                        request_id = %request_id,
                        path = %path,
                        error_code = %e.code(),
                        error_message = %e.message(),
                        duration_ms,
                        "RPC call failed"
                    );
                }
                Err(e) if config.level != LogLevel::Error => {
                    warn!(
                        request_id = %request_id,
                        path = %path,
                        error_code = %e.code(),
                        error_message = %e.message(),
                        duration_ms,
                        "RPC call rejected"
                    );
                }
                Err(_) => {}
            }

            result
        }
        .boxed()
    })
}
