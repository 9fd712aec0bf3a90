//! Structured input: one logical input split into `params`, `query`, `body`
//! and `headers`.

use super::route::ParsedRoute;
use crate::schema::{DynSchema, Schema};
use crate::validation::Issue;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Schemas for the parts of a structured input.
///
/// A part without a schema is not validated. Which parts end up in the
/// assembled input is decided by [`assemble_input`].
#[derive(Clone, Default)]
pub struct StructuredInputSchema {
    pub(crate) params: Option<DynSchema>,
    pub(crate) query: Option<DynSchema>,
    pub(crate) body: Option<DynSchema>,
    pub(crate) headers: Option<DynSchema>,
}

impl StructuredInputSchema {
    /// No part declared
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema for path parameters
    pub fn params(mut self, schema: impl Schema + 'static) -> Self {
        self.params = Some(Arc::new(schema));
        self
    }

    /// Schema for the query string
    pub fn query(mut self, schema: impl Schema + 'static) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    /// Schema for the body
    pub fn body(mut self, schema: impl Schema + 'static) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    /// Schema for the (lower-cased) headers
    pub fn headers(mut self, schema: impl Schema + 'static) -> Self {
        self.headers = Some(Arc::new(schema));
        self
    }

    /// Whether a params schema is declared
    pub fn has_params(&self) -> bool {
        self.params.is_some()
    }

    /// Whether a query schema is declared
    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    /// Whether a body schema is declared
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Whether a headers schema is declared
    pub fn has_headers(&self) -> bool {
        self.headers.is_some()
    }

    fn parts(&self) -> [(&'static str, Option<&DynSchema>); 4] {
        [
            ("params", self.params.as_ref()),
            ("query", self.query.as_ref()),
            ("body", self.body.as_ref()),
            ("headers", self.headers.as_ref()),
        ]
    }
}

impl fmt::Debug for StructuredInputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredInputSchema")
            .field("params", &self.has_params())
            .field("query", &self.has_query())
            .field("body", &self.has_body())
            .field("headers", &self.has_headers())
            .finish()
    }
}

/// Validates each present part with its own schema.
///
/// Issues are reported with the part name as the first path segment.
#[async_trait]
impl Schema for StructuredInputSchema {
    async fn validate(&self, value: Value) -> Result<Value, Vec<Issue>> {
        let mut object = match value {
            Value::Object(object) => object,
            Value::Null => Map::new(),
            _ => {
                return Err(vec![Issue::root(
                    "Structured input must be an object",
                    "invalid_type",
                )]);
            }
        };

        let mut issues = Vec::new();
        for (name, schema) in self.parts() {
            let Some(schema) = schema else {
                continue;
            };
            let part = object.remove(name).unwrap_or(Value::Null);
            match schema.validate(part).await {
                Ok(validated) => {
                    object.insert(name.to_string(), validated);
                }
                Err(part_issues) => {
                    issues.extend(part_issues.into_iter().map(|issue| issue.nested(name)));
                }
            }
        }

        if issues.is_empty() {
            Ok(Value::Object(object))
        } else {
            Err(issues)
        }
    }
}

/// Raw request parts before assembly.
#[derive(Debug, Clone, Default)]
pub struct RawInputParts {
    /// Decoded path parameters
    pub params: BTreeMap<String, String>,
    /// Parsed query string
    pub query: Map<String, Value>,
    /// Parsed body (`None` when empty)
    pub body: Option<Value>,
    /// Lower-cased headers
    pub headers: Map<String, Value>,
}

/// Build the structured input object for `route`.
///
/// - `params` is present when a params schema is declared or the path has a
///   placeholder
/// - `query` and `headers` are present only when their schema is declared
/// - `body` is present only when its schema is declared and the method
///   carries a body
pub fn assemble_input(route: &ParsedRoute, schema: &StructuredInputSchema, raw: RawInputParts) -> Value {
    let mut input = Map::new();

    if schema.has_params() || route.has_params() {
        let params = raw
            .params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        input.insert("params".to_string(), Value::Object(params));
    }
    if schema.has_query() {
        input.insert("query".to_string(), Value::Object(raw.query));
    }
    if schema.has_body() && route.method.allows_body() {
        input.insert("body".to_string(), raw.body.unwrap_or(Value::Null));
    }
    if schema.has_headers() {
        input.insert("headers".to_string(), Value::Object(raw.headers));
    }

    Value::Object(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::route::{RouteConfig, parse_route};
    use crate::schema::schema_fn;
    use serde_json::json;

    fn any() -> impl Schema {
        schema_fn(Ok)
    }

    fn raw() -> RawInputParts {
        let mut query = Map::new();
        query.insert("limit".into(), json!("10"));
        let mut headers = Map::new();
        headers.insert("x-token".into(), json!("t"));
        RawInputParts {
            params: BTreeMap::from([("id".to_string(), "earth".to_string())]),
            query,
            body: Some(json!({ "name": "Earth" })),
            headers,
        }
    }

    #[test]
    fn test_params_present_for_placeholder_path_without_schema() {
        let route = parse_route(&RouteConfig::get("/planets/{id}")).unwrap();
        let input = assemble_input(&route, &StructuredInputSchema::new(), raw());
        assert_eq!(input, json!({ "params": { "id": "earth" } }));
    }

    #[test]
    fn test_only_declared_parts_present() {
        let route = parse_route(&RouteConfig::put("/planets/{id}")).unwrap();
        let schema = StructuredInputSchema::new().body(any()).headers(any());
        let input = assemble_input(&route, &schema, raw());
        assert_eq!(
            input,
            json!({
                "params": { "id": "earth" },
                "body": { "name": "Earth" },
                "headers": { "x-token": "t" }
            })
        );
    }

    #[test]
    fn test_body_omitted_for_body_less_method() {
        let route = parse_route(&RouteConfig::delete("/planets")).unwrap();
        let schema = StructuredInputSchema::new().body(any()).query(any());
        let input = assemble_input(&route, &schema, raw());
        assert_eq!(input, json!({ "query": { "limit": "10" } }));
    }

    #[tokio::test]
    async fn test_structured_validation_prefixes_issues() {
        let schema = StructuredInputSchema::new().body(schema_fn(|v| {
            if v.get("name").is_some() {
                Ok(v)
            } else {
                Err(vec![Issue::required("name")])
            }
        }));

        let issues = schema.validate(json!({ "body": {} })).await.unwrap_err();
        assert_eq!(issues[0].path, vec!["body", "name"]);

        let ok = schema
            .validate(json!({ "body": { "name": "x" }, "params": { "id": "1" } }))
            .await
            .unwrap();
        assert_eq!(ok["params"]["id"], "1");
    }
}
