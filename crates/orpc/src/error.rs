//! Error types for RPC operations
//!
//! This module provides the typed application error that crosses the wire.
//!
//! # Error Codes
//!
//! Error codes are represented by the [`RpcErrorCode`] enum. Known codes carry
//! a default HTTP-like status; anything else travels as
//! [`RpcErrorCode::Custom`]. When serialized, codes are SCREAMING_SNAKE_CASE
//! strings.
//!
//! # Wire shape
//!
//! An [`RpcError`] always serializes to exactly
//! `{ "code", "status", "message", "data"? }` and its `status` is always
//! outside the `200..400` success band. Deserialization enforces the same rule.
//!
//! # Example
//! ```rust,ignore
//! use orpc::{RpcError, RpcErrorCode};
//!
//! let error = RpcError::new(RpcErrorCode::NotFound, "Planet not found");
//! let error = RpcError::not_found("Planet not found"); // Convenience method
//! let error = RpcError::new("OUT_OF_FUEL", "No fuel left").with_status(409)?;
//! ```

use crate::validation::Issue;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Returns true when `status` is a valid error status (below 200 or at least 400).
pub fn is_error_status(status: u16) -> bool {
    !(200..400).contains(&status)
}

/// Returns true when `json` has exactly the shape of a serialized [`RpcError`].
///
/// The object may only contain the keys `code`, `status`, `message` and
/// `data`; `code` and `message` must be strings and `status` must be an
/// integer error status.
pub fn is_error_json(json: &Value) -> bool {
    let Some(object) = json.as_object() else {
        return false;
    };

    const VALID_KEYS: [&str; 4] = ["code", "status", "message", "data"];
    if object.keys().any(|k| !VALID_KEYS.contains(&k.as_str())) {
        return false;
    }

    let code_ok = object.get("code").is_some_and(Value::is_string);
    let message_ok = object.get("message").is_some_and(Value::is_string);
    let status_ok = object
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .is_some_and(is_error_status);

    code_ok && status_ok && message_ok
}

/// Stable, machine-readable error codes.
///
/// Known codes map to a default status via [`RpcErrorCode::default_status`].
/// Application-specific codes use [`RpcErrorCode::Custom`] and default to 500.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RpcErrorCode {
    // Client errors (4xx)
    /// The request was malformed or its input failed validation
    BadRequest,
    /// Authentication is required
    Unauthorized,
    /// The authenticated caller lacks permission
    Forbidden,
    /// The requested resource was not found
    NotFound,
    /// The HTTP method is not supported for this route
    MethodNotSupported,
    /// The request timed out
    Timeout,
    /// The request conflicts with current state
    Conflict,
    /// The request payload exceeds size limits
    PayloadTooLarge,
    /// The request body has an unsupported content type
    UnsupportedMediaType,
    /// The request was well-formed but semantically invalid
    UnprocessableContent,
    /// Too many requests in a given window
    TooManyRequests,
    /// The client aborted the request
    ClientClosedRequest,

    // Server errors (5xx)
    /// The server produced something it should not have (e.g. invalid output)
    InternalServerError,
    /// An unexpected failure was translated at the transport boundary
    InternalError,
    /// The requested functionality is not implemented
    NotImplemented,
    /// An upstream service returned an invalid response
    BadGateway,
    /// The service is temporarily unavailable
    ServiceUnavailable,
    /// An upstream service timed out
    GatewayTimeout,

    /// Application-defined code
    Custom(String),
}

impl RpcErrorCode {
    /// Returns the wire representation of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            Self::Timeout => "TIMEOUT",
            Self::Conflict => "CONFLICT",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::UnprocessableContent => "UNPROCESSABLE_CONTENT",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::ClientClosedRequest => "CLIENT_CLOSED_REQUEST",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::BadGateway => "BAD_GATEWAY",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::GatewayTimeout => "GATEWAY_TIMEOUT",
            Self::Custom(code) => code,
        }
    }

    /// Parses a wire code. Unknown codes become [`RpcErrorCode::Custom`].
    pub fn parse(code: &str) -> Self {
        match code {
            "BAD_REQUEST" => Self::BadRequest,
            "UNAUTHORIZED" => Self::Unauthorized,
            "FORBIDDEN" => Self::Forbidden,
            "NOT_FOUND" => Self::NotFound,
            "METHOD_NOT_SUPPORTED" => Self::MethodNotSupported,
            "TIMEOUT" => Self::Timeout,
            "CONFLICT" => Self::Conflict,
            "PAYLOAD_TOO_LARGE" => Self::PayloadTooLarge,
            "UNSUPPORTED_MEDIA_TYPE" => Self::UnsupportedMediaType,
            "UNPROCESSABLE_CONTENT" => Self::UnprocessableContent,
            "TOO_MANY_REQUESTS" => Self::TooManyRequests,
            "CLIENT_CLOSED_REQUEST" => Self::ClientClosedRequest,
            "INTERNAL_SERVER_ERROR" => Self::InternalServerError,
            "INTERNAL_ERROR" => Self::InternalError,
            "NOT_IMPLEMENTED" => Self::NotImplemented,
            "BAD_GATEWAY" => Self::BadGateway,
            "SERVICE_UNAVAILABLE" => Self::ServiceUnavailable,
            "GATEWAY_TIMEOUT" => Self::GatewayTimeout,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Default status used when an error is built without an explicit one.
    pub fn default_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotSupported => 405,
            Self::Timeout => 408,
            Self::Conflict => 409,
            Self::PayloadTooLarge => 413,
            Self::UnsupportedMediaType => 415,
            Self::UnprocessableContent => 422,
            Self::TooManyRequests => 429,
            Self::ClientClosedRequest => 499,
            Self::InternalServerError | Self::InternalError | Self::Custom(_) => 500,
            Self::NotImplemented => 501,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
        }
    }

    /// Human-readable fallback message (e.g. `"Not Found"`).
    pub fn default_message(&self) -> String {
        self.as_str()
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let lower = word.to_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns true if this code defaults to a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.default_status())
    }

    /// Returns true if this code defaults to a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.default_status() >= 500
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RpcErrorCode {
    fn from(code: &str) -> Self {
        Self::parse(code)
    }
}

impl From<String> for RpcErrorCode {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl Serialize for RpcErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RpcErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::parse(&code))
    }
}

/// Returned when an error status falls inside the `200..400` success band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid error status {0}: must be below 200 or at least 400")]
pub struct InvalidErrorStatus(pub u16);

/// The serialized form of an [`RpcError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcErrorJson {
    /// Error code
    pub code: String,
    /// HTTP-like status, outside `200..400`
    pub status: u16,
    /// Human-readable message
    pub message: String,
    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Typed application error with a stable code, a status, and optional data.
///
/// Constructed at the point of failure, serialized at a transport boundary
/// and reconstructed from JSON by the client link.
///
/// # Example
/// ```rust,ignore
/// use orpc::{RpcError, RpcErrorCode};
///
/// let error = RpcError::new(RpcErrorCode::BadRequest, "Invalid planet")
///     .with_data(serde_json::json!({ "field": "name" }))
///     .with_cause("name was empty");
/// assert_eq!(error.status(), 400);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(into = "RpcErrorJson", try_from = "RpcErrorJson")]
#[error("[{code}] {message}")]
pub struct RpcError {
    code: RpcErrorCode,
    status: u16,
    message: String,
    data: Option<Value>,
    /// Debugging cause; never serialized.
    cause: Option<String>,
}

impl RpcError {
    /// Create a new error with the code's default status.
    pub fn new(code: impl Into<RpcErrorCode>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            status: code.default_status(),
            code,
            message: message.into(),
            data: None,
            cause: None,
        }
    }

    /// Create an error whose message is the code's default message.
    pub fn from_code(code: impl Into<RpcErrorCode>) -> Self {
        let code = code.into();
        let message = code.default_message();
        Self::new(code, message)
    }

    /// Override the status.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidErrorStatus`] if `status` is within `200..400`.
    pub fn with_status(mut self, status: u16) -> Result<Self, InvalidErrorStatus> {
        if !is_error_status(status) {
            return Err(InvalidErrorStatus(status));
        }
        self.status = status;
        Ok(self)
    }

    /// Attach structured data. Data that fails to serialize is dropped.
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// Add a cause string for debugging (not sent over the wire).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// The error code.
    pub fn code(&self) -> &RpcErrorCode {
        &self.code
    }

    /// The status, always outside `200..400`.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured data, if any.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// The debugging cause, if any.
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Serialize into the wire shape.
    pub fn to_json(&self) -> RpcErrorJson {
        RpcErrorJson {
            code: self.code.as_str().to_string(),
            status: self.status,
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }

    // Convenience constructors

    /// Create a BAD_REQUEST error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::BadRequest, message)
    }

    /// Create an UNAUTHORIZED error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::Unauthorized, message)
    }

    /// Create a FORBIDDEN error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::Forbidden, message)
    }

    /// Create a NOT_FOUND error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::NotFound, message)
    }

    /// Create a CONFLICT error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::Conflict, message)
    }

    /// Create a PAYLOAD_TOO_LARGE error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::PayloadTooLarge, message)
    }

    /// Create an UNSUPPORTED_MEDIA_TYPE error.
    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::UnsupportedMediaType, message)
    }

    /// Create an INTERNAL_SERVER_ERROR error.
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::InternalServerError, message)
    }

    /// Create the generic INTERNAL_ERROR used for unexpected failures.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::InternalError, message)
    }

    /// Wrap an unexpected failure into a generic INTERNAL_ERROR.
    ///
    /// The original failure is only kept as the (never serialized) cause.
    pub fn unexpected(cause: impl fmt::Display) -> Self {
        Self::internal("An error occurred while processing the request.")
            .with_cause(cause.to_string())
    }

    /// Build the `BAD_REQUEST` error raised for failed input validation.
    pub fn input_validation(issues: Vec<Issue>) -> Self {
        let cause = ValidationError::new("Input validation failed", issues.clone());
        Self::bad_request("Input validation failed")
            .with_data(serde_json::json!({ "issues": issues }))
            .with_cause(cause.to_string())
    }

    /// Build the `INTERNAL_SERVER_ERROR` raised for failed output validation.
    pub fn output_validation(issues: Vec<Issue>) -> Self {
        let cause = ValidationError::new("Output validation failed", issues);
        Self::internal_server_error("Output validation failed").with_cause(cause.to_string())
    }
}

impl From<RpcError> for RpcErrorJson {
    fn from(error: RpcError) -> Self {
        Self {
            code: error.code.as_str().to_string(),
            status: error.status,
            message: error.message,
            data: error.data,
        }
    }
}

impl TryFrom<RpcErrorJson> for RpcError {
    type Error = InvalidErrorStatus;

    fn try_from(json: RpcErrorJson) -> Result<Self, Self::Error> {
        if !is_error_status(json.status) {
            return Err(InvalidErrorStatus(json.status));
        }
        Ok(Self {
            code: RpcErrorCode::parse(&json.code),
            status: json.status,
            message: json.message,
            data: json.data,
            cause: None,
        })
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("Invalid JSON: {}", err))
    }
}

/// Input or output shape mismatch reported by a schema.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({} issue(s))", issues.len())]
pub struct ValidationError {
    /// Summary message
    pub message: String,
    /// Issues reported by the schema
    pub issues: Vec<Issue>,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(message: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            message: message.into(),
            issues,
        }
    }
}

/// Result type alias for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_codes_parse_back() {
        for code in [
            RpcErrorCode::BadRequest,
            RpcErrorCode::NotFound,
            RpcErrorCode::InternalServerError,
            RpcErrorCode::InternalError,
            RpcErrorCode::ClientClosedRequest,
        ] {
            assert_eq!(RpcErrorCode::parse(code.as_str()), code);
        }
        assert_eq!(
            RpcErrorCode::parse("OUT_OF_FUEL"),
            RpcErrorCode::Custom("OUT_OF_FUEL".to_string())
        );
    }

    #[test]
    fn test_default_status_and_message() {
        let error = RpcError::from_code(RpcErrorCode::NotFound);
        assert_eq!(error.status(), 404);
        assert_eq!(error.message(), "Not Found");

        let custom = RpcError::new("OUT_OF_FUEL", "empty");
        assert_eq!(custom.status(), 500);
    }

    #[test]
    fn test_with_status_rejects_success_band() {
        assert_eq!(
            RpcError::bad_request("x").with_status(200).unwrap_err(),
            InvalidErrorStatus(200)
        );
        assert_eq!(
            RpcError::bad_request("x").with_status(399).unwrap_err(),
            InvalidErrorStatus(399)
        );
        assert_eq!(
            RpcError::bad_request("x").with_status(199).unwrap().status(),
            199
        );
        assert_eq!(
            RpcError::bad_request("x").with_status(400).unwrap().status(),
            400
        );
    }

    #[test]
    fn test_serializes_exact_wire_shape() {
        let error = RpcError::not_found("gone").with_cause("secret");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(
            value,
            json!({ "code": "NOT_FOUND", "status": 404, "message": "gone" })
        );
        assert!(is_error_json(&value));
    }

    #[test]
    fn test_deserialize_rejects_success_status() {
        let result: Result<RpcError, _> =
            serde_json::from_value(json!({ "code": "X", "status": 200, "message": "m" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_is_error_json_predicate() {
        assert!(is_error_json(
            &json!({ "code": "X", "status": 500, "message": "m", "data": null })
        ));
        assert!(!is_error_json(
            &json!({ "code": "X", "status": 500, "message": "m", "extra": 1 })
        ));
        assert!(!is_error_json(&json!({ "code": "X", "status": 201, "message": "m" })));
        assert!(!is_error_json(&json!({ "code": 1, "status": 500, "message": "m" })));
        assert!(!is_error_json(&json!({ "status": 500, "message": "m" })));
        assert!(!is_error_json(&json!([1, 2])));
    }

    #[test]
    fn test_input_validation_error_carries_issues() {
        let error = RpcError::input_validation(vec![Issue::required("name")]);
        assert_eq!(error.code(), &RpcErrorCode::BadRequest);
        assert_eq!(error.status(), 400);
        let issues = &error.data().unwrap()["issues"];
        assert_eq!(issues[0]["code"], "required");
    }
}
