//! Handler traits and utilities
//!
//! This module provides the terminal stage of a procedure: a typed business
//! function that receives [`HandlerOptions`] with deserialized input.

use crate::signal::CancellationSignal;
use crate::{Context, RpcError, RpcResult};
use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{trace, warn};

/// Everything a handler sees of a call.
#[derive(Debug, Clone)]
pub struct HandlerOptions<Input> {
    /// Context after every middleware merged its partial
    pub context: Context,
    /// Validated input
    pub input: Input,
    /// Path segments of the procedure
    pub path: Vec<String>,
    /// Caller's cancellation signal, if any
    pub signal: Option<CancellationSignal>,
}

impl<Input> HandlerOptions<Input> {
    /// Replace the input, keeping everything else.
    pub fn map_input<T>(self, f: impl FnOnce(Input) -> T) -> HandlerOptions<T> {
        HandlerOptions {
            context: self.context,
            input: f(self.input),
            path: self.path,
            signal: self.signal,
        }
    }
}

/// Boxed handler for type erasure
pub(crate) type BoxedHandler =
    Arc<dyn Fn(HandlerOptions<Value>) -> BoxFuture<'static, RpcResult<Value>> + Send + Sync>;

/// Trait for handler functions
///
/// Automatically implemented for async functions with the signature:
/// `async fn(HandlerOptions<Input>) -> RpcResult<Output>`
pub trait Handler<Input, Output>: Clone + Send + Sync + 'static
where
    Input: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
{
    /// The future type returned by the handler
    type Future: Future<Output = RpcResult<Output>> + Send;

    /// Call the handler
    fn call(&self, options: HandlerOptions<Input>) -> Self::Future;
}

impl<Input, Output, F, Fut> Handler<Input, Output> for F
where
    Input: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
    F: Fn(HandlerOptions<Input>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<Output>> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, options: HandlerOptions<Input>) -> Self::Future {
        (self)(options)
    }
}

/// Convert a handler into a boxed handler for storage.
///
/// Input that does not deserialize into `Input` is a `BAD_REQUEST`; output
/// that does not serialize is an `INTERNAL_SERVER_ERROR`.
pub(crate) fn into_boxed<Input, Output, H>(handler: H) -> BoxedHandler
where
    Input: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
    H: Handler<Input, Output>,
{
    Arc::new(move |options: HandlerOptions<Value>| {
        let handler = handler.clone();
        Box::pin(async move {
            let HandlerOptions {
                context,
                input,
                path,
                signal,
            } = options;

            let input: Input = serde_json::from_value(input).map_err(|e| {
                warn!(error = %e, "Handler input deserialization failed");
                RpcError::bad_request(format!("Invalid input: {}", e))
            })?;

            trace!(path = ?path, "Executing handler");
            let output = handler
                .call(HandlerOptions {
                    context,
                    input,
                    path,
                    signal,
                })
                .await
                .inspect_err(|e| {
                    warn!(error_code = %e.code(), error_message = %e.message(), "Handler execution failed");
                })?;

            serde_json::to_value(output).map_err(|e| {
                warn!(error = %e, "Handler output serialization failed");
                RpcError::internal_server_error("Failed to serialize handler output")
                    .with_cause(e.to_string())
            })
        })
    })
}

/// Raw handler over JSON values, bypassing (de)serialization.
pub(crate) fn from_value_fn<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(HandlerOptions<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<Value>> + Send + 'static,
{
    Arc::new(move |options| Box::pin(f(options)))
}
