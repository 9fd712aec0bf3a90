//! Contract/REST link: method and path come from the route, the structured
//! input is spread over path, query string, headers and body.

use super::{HttpTransport, Link, TransportError, send_with_limits};
use crate::client::{ClientError, ClientOptions};
use crate::config::LinkConfig;
use crate::contract::{ContractProcedure, ParsedRoute};
use crate::encoding::{encode_component, encode_query, parse_emptyable_json, stringify_emptyable_json};
use crate::error::{RpcError, is_error_json, is_error_status};
use crate::http::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::debug;

/// Link speaking the contract/REST profile.
///
/// Routes are registered per dotted procedure path. The call input is the
/// structured object `{params?, query?, body?, headers?}` and the result is
/// `{status, data}`.
#[derive(Debug, Clone)]
pub struct ContractLink<T> {
    config: LinkConfig,
    transport: T,
    routes: HashMap<String, ParsedRoute>,
}

impl<T: HttpTransport> ContractLink<T> {
    /// Create a link without routes
    pub fn new(config: LinkConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            routes: HashMap::new(),
        }
    }

    /// Register `route` for the dotted procedure `path`
    pub fn route(mut self, path: impl Into<String>, route: ParsedRoute) -> Self {
        self.routes.insert(path.into(), route);
        self
    }

    /// Register the route of `contract` for the dotted procedure `path`
    pub fn contract(self, path: impl Into<String>, contract: &ContractProcedure) -> Self {
        self.route(path, contract.route().clone())
    }

    /// Call `route` directly with a structured input.
    pub async fn call_route(
        &self,
        route: &ParsedRoute,
        input: Option<Value>,
        options: ClientOptions,
    ) -> Result<Value, ClientError> {
        let input = match input {
            Some(Value::Object(object)) => object,
            None | Some(Value::Null) => Map::new(),
            Some(_) => {
                return Err(TransportError::Config("Contract input must be an object".to_string()).into());
            }
        };

        let mut target = substitute_params(route, input.get("params"))?;
        if let Some(Value::Object(query)) = input.get("query") {
            let query = encode_query(query);
            if !query.is_empty() {
                target.push('?');
                target.push_str(&query);
            }
        }

        let mut request = HttpRequest::new(route.method.as_str(), &target).with_signal(options.signal);
        if let Some(Value::Object(headers)) = input.get("headers") {
            for (name, value) in headers {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                request = request.with_header(name.as_str(), value);
            }
        }
        if route.method.allows_body() {
            let body = stringify_emptyable_json(input.get("body"))?;
            if !body.is_empty() && request.header("content-type").is_none() {
                request = request.with_header("content-type", "application/json");
            }
            request = request.with_body(body);
        }

        let response = send_with_limits(&self.transport, &self.config, request).await?;
        decode_contract_response(response)
    }
}

#[async_trait]
impl<T: HttpTransport> Link for ContractLink<T> {
    async fn call(
        &self,
        path: &[String],
        input: Option<Value>,
        options: ClientOptions,
    ) -> Result<Option<Value>, ClientError> {
        let key = path.join(".");
        let route = self
            .routes
            .get(&key)
            .ok_or_else(|| TransportError::Config(format!("No route registered for '{}'", key)))?;
        self.call_route(route, input, options).await.map(Some)
    }
}

/// Fill the route's placeholders with encoded parameter values.
fn substitute_params(route: &ParsedRoute, params: Option<&Value>) -> Result<String, TransportError> {
    let mut path = route.path.clone();
    for name in &route.path_params {
        let value = match params.and_then(|p| p.get(name)) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                return Err(TransportError::Config(format!(
                    "Missing path parameter '{}' for {}",
                    name, route.path
                )));
            }
            Some(other) => other.to_string(),
        };
        path = path.replacen(&format!("{{{}}}", name), &encode_component(&value), 1);
    }
    Ok(path)
}

/// Decode `{status, data}`.
///
/// An error status with an error-shaped body is an [`RpcError`]; any other
/// JSON (or empty) body is data for its status, whatever the status.
fn decode_contract_response(response: HttpResponse) -> Result<Value, ClientError> {
    let data = match parse_emptyable_json(&response.body) {
        Ok(data) => data,
        Err(e) if response.is_success() => return Err(e.into()),
        Err(_) => {
            return Err(ClientError::Status {
                status: response.status,
                body: response.text(),
            });
        }
    };

    if is_error_status(response.status)
        && let Some(json) = &data
        && is_error_json(json)
    {
        let error: RpcError = serde_json::from_value(json.clone())?;
        debug!(code = %error.code(), status = error.status(), "Received RPC error");
        return Err(ClientError::Rpc(error));
    }

    Ok(json!({
        "status": response.status,
        "data": data.unwrap_or(Value::Null),
    }))
}
