//! Route templates
//!
//! `{name}` placeholders in a route path become `([^/]+)` capture groups; the
//! rest of the path is used verbatim as a pattern, so regex metacharacters in
//! a literal segment keep their regex meaning.

use super::ContractBuildError;
use crate::encoding::decode_component;
use crate::http::HttpMethod;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Declared HTTP route of a contract procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// HTTP method
    pub method: HttpMethod,
    /// Path template, e.g. `/planets/{id}`
    pub path: String,
    /// Short summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RouteConfig {
    /// Route for `method` and `path`
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            summary: None,
            description: None,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// `POST path`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// `PUT path`
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// `PATCH path`
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// Set the summary
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A route compiled into a matcher.
#[derive(Debug, Clone)]
pub struct ParsedRoute {
    /// HTTP method
    pub method: HttpMethod,
    /// The original path template
    pub path: String,
    /// Unanchored pattern, e.g. `/planets/([^/]+)`
    pub path_pattern: String,
    /// Placeholder names in capture-group order
    pub path_params: Vec<String>,
    /// Short summary
    pub summary: Option<String>,
    /// Longer description
    pub description: Option<String>,
    matcher: Regex,
}

impl ParsedRoute {
    /// Whether the template has at least one placeholder
    pub fn has_params(&self) -> bool {
        !self.path_params.is_empty()
    }

    /// Whether `path` matches the whole pattern
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

impl PartialEq for ParsedRoute {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
            && self.path == other.path
            && self.summary == other.summary
            && self.description == other.description
    }
}

/// Split a template into its pattern and placeholder names.
fn compile_template(template: &str) -> (String, Vec<String>) {
    let mut pattern = String::with_capacity(template.len());
    let mut params = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        pattern.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if close > 0 => {
                params.push(after[..close].to_string());
                pattern.push_str("([^/]+)");
                rest = &after[close + 1..];
            }
            _ => {
                // `{}` or an unclosed brace stays literal
                pattern.push('{');
                rest = after;
            }
        }
    }
    pattern.push_str(rest);

    (pattern, params)
}

/// Parse a route configuration into a matcher.
///
/// # Errors
///
/// [`ContractBuildError::InvalidRoutePattern`] when the resulting pattern is
/// not a valid regex (a literal segment containing unbalanced regex syntax).
pub fn parse_route(config: &RouteConfig) -> Result<ParsedRoute, ContractBuildError> {
    let (path_pattern, path_params) = compile_template(&config.path);
    let matcher = Regex::new(&format!("^{}$", path_pattern)).map_err(|e| {
        ContractBuildError::InvalidRoutePattern {
            path: config.path.clone(),
            reason: e.to_string(),
        }
    })?;

    trace!(path = %config.path, pattern = %path_pattern, params = ?path_params, "Parsed route");

    Ok(ParsedRoute {
        method: config.method,
        path: config.path.clone(),
        path_pattern,
        path_params,
        summary: config.summary.clone(),
        description: config.description.clone(),
        matcher,
    })
}

/// Whether `method` (any case) and `path` (whole, anchored) match `route`.
pub fn matches_route(method: &str, path: &str, route: &ParsedRoute) -> bool {
    method.eq_ignore_ascii_case(route.method.as_str()) && route.is_match(path)
}

/// Extract and percent-decode placeholder values from `path`.
///
/// Returns `None` when the path does not match. A value that fails to decode
/// is left out of the map instead of failing the whole extraction.
pub fn extract_path_params(path: &str, route: &ParsedRoute) -> Option<BTreeMap<String, String>> {
    let captures = route.matcher.captures(path)?;

    let params = route
        .path_params
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let raw = captures.get(i + 1)?.as_str();
            match decode_component(raw) {
                Some(value) => Some((name.clone(), value)),
                None => {
                    trace!(param = %name, raw = %raw, "Skipping undecodable path parameter");
                    None
                }
            }
        })
        .collect();

    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_without_params() {
        let route = parse_route(&RouteConfig::get("/planets").summary("List planets")).unwrap();
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.path_pattern, "/planets");
        assert!(route.path_params.is_empty());
        assert_eq!(route.summary.as_deref(), Some("List planets"));
    }

    #[test]
    fn test_parse_route_with_params() {
        let route = parse_route(&RouteConfig::get("/planets/{id}/moons/{moonId}")).unwrap();
        assert_eq!(route.path_pattern, "/planets/([^/]+)/moons/([^/]+)");
        assert_eq!(route.path_params, vec!["id", "moonId"]);
    }

    #[test]
    fn test_empty_braces_stay_literal() {
        let (pattern, params) = compile_template("/a/{}/{b}");
        assert_eq!(pattern, "/a/{}/([^/]+)");
        assert_eq!(params, vec!["b"]);

        let (pattern, params) = compile_template("/a/{open");
        assert_eq!(pattern, "/a/{open");
        assert!(params.is_empty());
    }

    #[test]
    fn test_literal_is_not_escaped() {
        let route = parse_route(&RouteConfig::get("/v1.0/items")).unwrap();
        assert!(route.is_match("/v1.0/items"));
        assert!(route.is_match("/v1x0/items"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = parse_route(&RouteConfig::get("/items(")).unwrap_err();
        assert!(matches!(err, ContractBuildError::InvalidRoutePattern { .. }));
    }

    #[test]
    fn test_extract_path_params() {
        let route = parse_route(&RouteConfig::get("/planets/{id}/moons/{moonId}")).unwrap();
        let params = extract_path_params("/planets/earth/moons/luna", &route).unwrap();
        assert_eq!(params["id"], "earth");
        assert_eq!(params["moonId"], "luna");

        assert!(extract_path_params("/users/123", &route).is_none());
        assert!(extract_path_params("/planets/earth/moons/luna/extra", &route).is_none());
    }

    #[test]
    fn test_extract_decodes_and_skips_bad_values() {
        let route = parse_route(&RouteConfig::get("/planets/{id}")).unwrap();
        let params = extract_path_params("/planets/hello%20world", &route).unwrap();
        assert_eq!(params["id"], "hello world");

        let route = parse_route(&RouteConfig::get("/a/{x}/b/{y}")).unwrap();
        let params = extract_path_params("/a/%E0%A4%A/b/ok", &route).unwrap();
        assert!(!params.contains_key("x"));
        assert_eq!(params["y"], "ok");
    }

    #[test]
    fn test_matches_route() {
        let route = parse_route(&RouteConfig::post("/planets")).unwrap();
        assert!(matches_route("post", "/planets", &route));
        assert!(matches_route("POST", "/planets", &route));
        assert!(!matches_route("GET", "/planets", &route));
        assert!(!matches_route("POST", "/planets/1", &route));
        assert!(!matches_route("POST", "/api/planets", &route));
    }
}
