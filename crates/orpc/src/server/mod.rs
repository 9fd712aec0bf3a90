//! Server-side request handlers
//!
//! A [`RequestHandler`] answers one transport-neutral [`HttpRequest`]. It
//! either claims the request (`matched: true` with exactly one response) or
//! declines it so that another handler, or the listener's own fallback, can
//! answer.

#[cfg(feature = "axum")]
mod axum;
mod contract;
mod json;

#[cfg(feature = "axum")]
pub use self::axum::{into_http_request, into_axum_response, rpc_service};
pub use contract::ContractHandler;
pub use json::JsonHandler;

use crate::config::HandlerConfig;
use crate::error::RpcErrorCode;
use crate::http::{HttpRequest, HttpResponse};
use crate::pipeline::{self, CallOptions};
use crate::procedure::Procedure;
use crate::{Context, RpcError, RpcResult};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::error;

/// Outcome of [`RequestHandler::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleResult {
    /// Whether the handler claimed the request
    pub matched: bool,
    /// The response, present exactly when `matched`
    pub response: Option<HttpResponse>,
}

impl HandleResult {
    /// The request is not for this handler
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            response: None,
        }
    }

    /// The request was answered with `response`
    pub fn matched(response: HttpResponse) -> Self {
        Self {
            matched: true,
            response: Some(response),
        }
    }
}

/// Answers transport-neutral requests.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle `request` with `context` as the initial procedure context.
    async fn handle(&self, request: HttpRequest, context: Context) -> HandleResult;
}

/// Ordered fallback chain of handlers.
///
/// The first handler that matches answers; if none does the result is
/// unmatched.
#[derive(Clone, Default)]
pub struct Handlers {
    handlers: Vec<Arc<dyn RequestHandler>>,
}

impl Handlers {
    /// Empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler
    pub fn with(mut self, handler: impl RequestHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Number of handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl RequestHandler for Handlers {
    async fn handle(&self, request: HttpRequest, context: Context) -> HandleResult {
        for handler in &self.handlers {
            let result = handler.handle(request.clone(), context.clone()).await;
            if result.matched {
                return result;
            }
        }
        HandleResult::unmatched()
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers").field("len", &self.handlers.len()).finish()
    }
}

/// Strip the configured prefix. `None` when the path is outside it.
pub(crate) fn strip_prefix<'a>(path: &'a str, prefix: Option<&str>) -> Option<&'a str> {
    let Some(prefix) = prefix else {
        return Some(path);
    };
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Run the pipeline, turning a panic anywhere in it into `INTERNAL_ERROR`.
pub(crate) async fn execute_guarded(procedure: &Arc<Procedure>, options: CallOptions) -> RpcResult<Value> {
    match AssertUnwindSafe(pipeline::execute(procedure, options)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(panic = %message, "Procedure panicked");
            Err(RpcError::unexpected(message))
        }
    }
}

/// The error response for `error`.
///
/// With `expose_internal_errors`, an `INTERNAL_ERROR` carries its cause as the
/// message instead of the generic one.
pub(crate) fn error_response(error: RpcError, config: &HandlerConfig) -> HttpResponse {
    let expose = config.expose_internal_errors && *error.code() == RpcErrorCode::InternalError;
    let error = match error.cause().map(str::to_string) {
        Some(cause) if expose => RpcError::internal(cause),
        _ => error,
    };
    HttpResponse::error(&error)
}
