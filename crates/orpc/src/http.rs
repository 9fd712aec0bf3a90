//! Transport-neutral HTTP request and response
//!
//! Listeners (axum, tests, anything else) convert their native types into
//! [`HttpRequest`] and back from [`HttpResponse`]; links build
//! [`HttpRequest`]s and hand them to an [`HttpTransport`](crate::link::HttpTransport).

use crate::encoding::{parse_emptyable_json, parse_query};
use crate::error::RpcError;
use crate::signal::CancellationSignal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// HTTP methods a contract route may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

impl HttpMethod {
    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    /// Whether requests with this method carry a body (`POST`, `PUT`, `PATCH`).
    pub fn allows_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unsupported method name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Inbound or outbound HTTP request.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    /// Method name as received (any case)
    pub method: String,
    /// Percent-encoded URL path, e.g. `/rpc/planet/find`
    pub path: String,
    /// Raw query string without the `?`
    pub query: Option<String>,
    /// Header pairs in arrival order
    pub headers: Vec<(String, String)>,
    /// Raw body
    pub body: Vec<u8>,
    /// Cancellation signal tied to the request
    pub signal: Option<CancellationSignal>,
}

impl HttpRequest {
    /// Create a request for `method` and a path with optional query string.
    pub fn new(method: impl Into<String>, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method: method.into(),
            path,
            query,
            ..Self::default()
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the raw body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type.
    pub fn with_json(self, value: &Value) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .with_header("content-type", "application/json")
            .with_body(body))
    }

    /// Attach a cancellation signal
    pub fn with_signal(mut self, signal: Option<CancellationSignal>) -> Self {
        self.signal = signal;
        self
    }

    /// First header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The `content-type` header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Query string parsed into a JSON object of strings
    pub fn query_object(&self) -> Map<String, Value> {
        self.query
            .as_deref()
            .map(|q| parse_query(q, false))
            .unwrap_or_default()
    }

    /// Headers as a JSON object with lower-cased names.
    ///
    /// Repeated headers are joined with `", "`.
    pub fn headers_object(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (name, value) in &self.headers {
            let name = name.to_ascii_lowercase();
            let joined = match map.get(&name) {
                Some(Value::String(existing)) => format!("{}, {}", existing, value),
                _ => value.clone(),
            };
            map.insert(name, Value::String(joined));
        }
        map
    }

    /// Path and query as one string
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }
}

/// HTTP response produced by a handler or received by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Header pairs
    pub headers: Vec<(String, String)>,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response with no headers and an empty body
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// JSON response
    pub fn json(status: u16, value: &Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(value)?,
        })
    }

    /// JSON response for an error, using the error's own status.
    pub fn error(error: &RpcError) -> Self {
        let body = serde_json::to_vec(&error.to_json()).unwrap_or_default();
        Self {
            status: error.status(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    /// First header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Why a request body could not be turned into a value.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body claimed to be JSON but was not
    #[error("Malformed JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// A text body was not UTF-8
    #[error("Body is not valid UTF-8")]
    InvalidText,
    /// The content type is not supported
    #[error("Unsupported content type: {0}")]
    UnsupportedMediaType(String),
}

impl From<BodyError> for RpcError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::UnsupportedMediaType(_) => RpcError::unsupported_media_type(err.to_string()),
            BodyError::InvalidJson(_) | BodyError::InvalidText => RpcError::bad_request(err.to_string()),
        }
    }
}

/// Parse a body according to its content type.
///
/// | content type | result |
/// |---|---|
/// | absent, `application/json` | emptyable JSON (`None` when empty) |
/// | `application/x-www-form-urlencoded` | object of decoded pairs |
/// | `text/plain` | string |
/// | anything else | [`BodyError::UnsupportedMediaType`] |
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Option<Value>, BodyError> {
    let content_type = content_type.map(|ct| ct.trim().to_ascii_lowercase());

    match content_type.as_deref() {
        None | Some("") => Ok(parse_emptyable_json(body)?),
        Some(ct) if ct.starts_with("application/json") => Ok(parse_emptyable_json(body)?),
        Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
            let text = std::str::from_utf8(body).map_err(|_| BodyError::InvalidText)?;
            Ok(Some(Value::Object(parse_query(text, true))))
        }
        Some(ct) if ct.starts_with("text/plain") => {
            let text = std::str::from_utf8(body).map_err(|_| BodyError::InvalidText)?;
            Ok(Some(Value::String(text.to_string())))
        }
        Some(ct) => Err(BodyError::UnsupportedMediaType(ct.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("OPTIONS".parse::<HttpMethod>().is_err());
        assert!(HttpMethod::Put.allows_body());
        assert!(!HttpMethod::Delete.allows_body());
    }

    #[test]
    fn test_request_splits_query_and_reads_headers() {
        let request = HttpRequest::new("GET", "/planets?limit=10&q=earth")
            .with_header("X-Token", "a")
            .with_header("x-token", "b");

        assert_eq!(request.path, "/planets");
        assert_eq!(request.query_object()["limit"], "10");
        assert_eq!(request.header("x-TOKEN"), Some("a"));
        assert_eq!(request.headers_object()["x-token"], "a, b");
        assert_eq!(request.path_and_query(), "/planets?limit=10&q=earth");
    }

    #[test]
    fn test_parse_body_by_content_type() {
        assert_eq!(parse_body(None, b"").unwrap(), None);
        assert_eq!(
            parse_body(Some("application/json; charset=utf-8"), b"[1]").unwrap(),
            Some(json!([1]))
        );
        assert_eq!(
            parse_body(Some("application/x-www-form-urlencoded"), b"a=1&b=x+y").unwrap(),
            Some(json!({ "a": "1", "b": "x y" }))
        );
        assert_eq!(
            parse_body(Some("text/plain"), b"hi").unwrap(),
            Some(json!("hi"))
        );
        assert!(matches!(
            parse_body(Some("application/octet-stream"), b"x"),
            Err(BodyError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            parse_body(Some("application/json"), b"{"),
            Err(BodyError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_body_error_statuses() {
        let unsupported: RpcError = BodyError::UnsupportedMediaType("x".into()).into();
        assert_eq!(unsupported.status(), 415);
        let invalid: RpcError = BodyError::InvalidText.into();
        assert_eq!(invalid.status(), 400);
    }

    #[test]
    fn test_error_response() {
        let response = HttpResponse::error(&RpcError::not_found("gone"));
        assert_eq!(response.status, 404);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({ "code": "NOT_FOUND", "status": 404, "message": "gone" }));
    }
}
