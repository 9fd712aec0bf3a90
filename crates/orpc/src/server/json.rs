//! JSON/RPC handler: `POST {prefix}/{path}` with a JSON body.

use super::{HandleResult, RequestHandler, error_response, execute_guarded, strip_prefix};
use crate::config::{ConfigValidationError, HandlerConfig};
use crate::encoding::{decode_path_segments, parse_emptyable_json};
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::RequestId;
use crate::pipeline::CallOptions;
use crate::router::Router;
use crate::{Context, RpcError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Serves a [`Router`] over the JSON/RPC profile.
///
/// The URL path after the prefix names the procedure, one percent-decoded
/// segment per router level. The body is the JSON input (empty for none),
/// the response is `200` with the JSON output or the error's status with the
/// error JSON.
#[derive(Debug, Clone)]
pub struct JsonHandler {
    router: Arc<Router>,
    config: HandlerConfig,
}

impl JsonHandler {
    /// Handler for `router` with default configuration
    pub fn new(router: impl Into<Arc<Router>>) -> Self {
        Self {
            router: router.into(),
            config: HandlerConfig::default(),
        }
    }

    /// Handler for `router` with `config`
    ///
    /// # Errors
    ///
    /// Returns the [`HandlerConfig::validate`] error for an invalid `config`,
    /// e.g. a prefix ending with `/`.
    pub fn with_config(router: impl Into<Arc<Router>>, config: HandlerConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        Ok(Self {
            router: router.into(),
            config,
        })
    }

    /// The configuration
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// The served router
    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[async_trait]
impl RequestHandler for JsonHandler {
    async fn handle(&self, request: HttpRequest, context: Context) -> HandleResult {
        let Some(rest) = strip_prefix(&request.path, self.config.prefix.as_deref()) else {
            return HandleResult::unmatched();
        };
        let Some(path) = decode_path_segments(rest) else {
            debug!(path = %request.path, "Undecodable procedure path");
            return HandleResult::unmatched();
        };
        let Some(procedure) = self.router.resolve(&path) else {
            return HandleResult::unmatched();
        };

        let request_id = RequestId::new();
        let start = Instant::now();
        let dotted = path.join(".");
        debug!(request_id = %request_id, path = %dotted, "RPC call started");

        if request.body.len() > self.config.max_body_size {
            warn!(
                request_id = %request_id,
                path = %dotted,
                size = request.body.len(),
                limit = self.config.max_body_size,
                "Request body too large"
            );
            let error = RpcError::payload_too_large(format!(
                "Request body exceeds {} bytes",
                self.config.max_body_size
            ));
            return HandleResult::matched(error_response(error, &self.config));
        }

        let input = match parse_emptyable_json(&request.body) {
            Ok(input) => input,
            Err(e) => {
                warn!(request_id = %request_id, path = %dotted, error = %e, "Malformed request body");
                return HandleResult::matched(error_response(RpcError::from(e), &self.config));
            }
        };

        let options = CallOptions::new(input.unwrap_or_default())
            .with_context(context)
            .with_path(path)
            .with_signal(request.signal.clone());

        let response = match execute_guarded(procedure, options).await {
            Ok(output) => {
                debug!(
                    request_id = %request_id,
                    path = %dotted,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "RPC call completed"
                );
                HttpResponse::json(200, &output).unwrap_or_else(|e| {
                    error_response(RpcError::unexpected(e), &self.config)
                })
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    path = %dotted,
                    error_code = %e.code(),
                    error_message = %e.message(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "RPC call failed"
                );
                error_response(e, &self.config)
            }
        };

        HandleResult::matched(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::os;
    use crate::handler::HandlerOptions;
    use crate::middleware::{MiddlewareOptions, Next};
    use serde_json::{Value, json};

    fn router() -> Router {
        let echo = os().value_handler(|opts: HandlerOptions<Value>| async move { Ok(opts.input) });
        let fail = os().value_handler(|_: HandlerOptions<Value>| async move {
            Err(RpcError::not_found("Planet not found").with_data(json!({ "id": 9 })))
        });
        let boom = os().value_handler(|_: HandlerOptions<Value>| async move {
            if true {
                panic!("kaboom");
            }
            Ok(Value::Null)
        });
        let whoami = os()
            .use_middleware(|ctx: Context, _: MiddlewareOptions, next: Next| async move {
                let user = ctx.get::<String>("user").map(|u| u.to_string()).unwrap_or_default();
                next.run(Context::new().with("greeting", format!("hi {}", user))).await
            })
            .value_handler(|opts: HandlerOptions<Value>| async move {
                Ok(json!(opts.context.get::<String>("greeting").map(|g| g.to_string())))
            });

        Router::new().nest(
            "planet",
            Router::new()
                .procedure("echo", echo)
                .procedure("fail", fail)
                .procedure("boom", boom)
                .procedure("whoami", whoami)
                .procedure("a b", os().value_handler(|_: HandlerOptions<Value>| async { Ok(json!("spaced")) })),
        )
    }

    fn handler() -> JsonHandler {
        JsonHandler::with_config(router(), HandlerConfig::new().with_prefix("/rpc").with_max_body_size(64)).unwrap()
    }

    async fn send(request: HttpRequest) -> HandleResult {
        handler().handle(request, Context::new().with("user", "ada".to_string())).await
    }

    fn json_body(result: &HandleResult) -> Value {
        let response = result.response.as_ref().unwrap();
        serde_json::from_slice(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_success_returns_output() {
        let result = send(HttpRequest::new("POST", "/rpc/planet/echo").with_body(r#"{"id":1}"#)).await;
        assert!(result.matched);
        assert_eq!(result.response.as_ref().unwrap().status, 200);
        assert_eq!(json_body(&result), json!({ "id": 1 }));
    }

    #[tokio::test]
    async fn test_empty_body_is_no_input() {
        let result = send(HttpRequest::new("POST", "/rpc/planet/echo/")).await;
        assert_eq!(json_body(&result), Value::Null);
    }

    #[tokio::test]
    async fn test_unmatched_requests() {
        for path in ["/api/planet/echo", "/rpcx/planet/echo", "/rpc/planet", "/rpc/planet/missing", "/rpc/planet/%E0%A4%A"] {
            let result = send(HttpRequest::new("POST", path)).await;
            assert_eq!(result, HandleResult::unmatched(), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_segments_are_percent_decoded() {
        let result = send(HttpRequest::new("POST", "/rpc/planet/a%20b")).await;
        assert_eq!(json_body(&result), json!("spaced"));
    }

    #[tokio::test]
    async fn test_rpc_error_keeps_status_and_data() {
        let result = send(HttpRequest::new("POST", "/rpc/planet/fail")).await;
        assert_eq!(result.response.as_ref().unwrap().status, 404);
        assert_eq!(
            json_body(&result),
            json!({ "code": "NOT_FOUND", "status": 404, "message": "Planet not found", "data": { "id": 9 } })
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let result = send(HttpRequest::new("POST", "/rpc/planet/boom")).await;
        assert_eq!(result.response.as_ref().unwrap().status, 500);
        let body = json_body(&result);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "An error occurred while processing the request.");
    }

    #[tokio::test]
    async fn test_malformed_and_oversized_bodies() {
        let result = send(HttpRequest::new("POST", "/rpc/planet/echo").with_body("{nope")).await;
        assert_eq!(result.response.as_ref().unwrap().status, 400);

        let big = format!("\"{}\"", "x".repeat(100));
        let result = send(HttpRequest::new("POST", "/rpc/planet/echo").with_body(big)).await;
        assert_eq!(result.response.as_ref().unwrap().status, 413);
        assert_eq!(json_body(&result)["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_request_context_reaches_handler() {
        let result = send(HttpRequest::new("POST", "/rpc/planet/whoami")).await;
        assert_eq!(json_body(&result), json!("hi ada"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = JsonHandler::with_config(router(), HandlerConfig::new().with_prefix("/rpc/")).unwrap_err();
        assert_eq!(err, ConfigValidationError::InvalidPrefix("/rpc/".to_string()));

        let err = JsonHandler::with_config(router(), HandlerConfig::new().with_max_body_size(0)).unwrap_err();
        assert_eq!(err, ConfigValidationError::InvalidMaxBodySize);
    }
}
