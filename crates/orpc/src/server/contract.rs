//! Contract/REST handler: method and path select a contract procedure.

use super::{HandleResult, RequestHandler, error_response, execute_guarded, strip_prefix};
use crate::config::{ConfigValidationError, HandlerConfig};
use crate::contract::{ContractProcedure, ContractResponse, RawInputParts, assemble_input, extract_path_params, matches_route};
use crate::http::{HttpResponse, HttpRequest, parse_body};
use crate::logging::RequestId;
use crate::pipeline::CallOptions;
use crate::{Context, RpcError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Serves contract procedures over their declared routes.
///
/// Contracts are tried in registration order; the first whose route matches
/// the method and path answers. Errors are written exactly like
/// [`JsonHandler`](super::JsonHandler) writes them.
#[derive(Debug, Clone, Default)]
pub struct ContractHandler {
    contracts: Vec<(Vec<String>, ContractProcedure)>,
    config: HandlerConfig,
}

impl ContractHandler {
    /// Handler without contracts and with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler with `config`
    ///
    /// # Errors
    ///
    /// Returns the [`HandlerConfig::validate`] error for an invalid `config`.
    pub fn with_config(config: HandlerConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        Ok(Self {
            contracts: Vec::new(),
            config,
        })
    }

    /// Register `contract` under the dotted procedure name `name`.
    pub fn contract(mut self, name: &str, contract: ContractProcedure) -> Self {
        let path = name.split('.').map(str::to_string).collect();
        self.contracts.push((path, contract));
        self
    }

    /// Number of registered contracts
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Whether no contract is registered
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    fn find(&self, method: &str, path: &str) -> Option<&(Vec<String>, ContractProcedure)> {
        self.contracts
            .iter()
            .find(|(_, contract)| matches_route(method, path, contract.route()))
    }
}

/// Write a `{status, data}` output as a response. `null` data is an empty body.
fn contract_response(output: Value) -> Result<HttpResponse, RpcError> {
    let response: ContractResponse<Value> = serde_json::from_value(output).map_err(|e| {
        RpcError::internal_server_error("Contract handler returned an invalid response").with_cause(e.to_string())
    })?;
    if !(100..=599).contains(&response.status) {
        return Err(RpcError::internal_server_error(format!(
            "Contract handler returned invalid status {}",
            response.status
        )));
    }
    if response.data.is_null() {
        return Ok(HttpResponse::empty(response.status));
    }
    HttpResponse::json(response.status, &response.data).map_err(RpcError::unexpected)
}

#[async_trait]
impl RequestHandler for ContractHandler {
    async fn handle(&self, request: HttpRequest, context: Context) -> HandleResult {
        let Some(rest) = strip_prefix(&request.path, self.config.prefix.as_deref()) else {
            return HandleResult::unmatched();
        };
        let route_path = if rest.is_empty() { "/" } else { rest };
        let Some((name, contract)) = self.find(&request.method, route_path) else {
            return HandleResult::unmatched();
        };
        let route = contract.route();

        let request_id = RequestId::new();
        let start = Instant::now();
        debug!(request_id = %request_id, method = %route.method, route = %route.path, "REST call started");

        if request.body.len() > self.config.max_body_size {
            let error = RpcError::payload_too_large(format!(
                "Request body exceeds {} bytes",
                self.config.max_body_size
            ));
            return HandleResult::matched(error_response(error, &self.config));
        }

        let body = if contract.input_schema().has_body() && route.method.allows_body() {
            match parse_body(request.content_type(), &request.body) {
                Ok(body) => body,
                Err(e) => {
                    warn!(request_id = %request_id, route = %route.path, error = %e, "Unreadable request body");
                    return HandleResult::matched(error_response(RpcError::from(e), &self.config));
                }
            }
        } else {
            None
        };

        let raw = RawInputParts {
            params: extract_path_params(route_path, route).unwrap_or_default(),
            query: request.query_object(),
            body,
            headers: request.headers_object(),
        };
        let input = assemble_input(route, contract.input_schema(), raw);

        let options = CallOptions::new(input)
            .with_context(context)
            .with_path(name.clone())
            .with_signal(request.signal.clone());

        let result = execute_guarded(&contract.to_procedure(), options)
            .await
            .and_then(contract_response);
        let duration_ms = start.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => {
                debug!(request_id = %request_id, route = %route.path, status = response.status, duration_ms, "REST call completed");
                response
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    route = %route.path,
                    error_code = %e.code(),
                    error_message = %e.message(),
                    duration_ms,
                    "REST call failed"
                );
                error_response(e, &self.config)
            }
        };

        HandleResult::matched(response)
    }
}
