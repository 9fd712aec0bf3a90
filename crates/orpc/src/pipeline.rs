//! Dispatch pipeline
//!
//! Executes one procedure call: input validation, the middleware chain in
//! declaration order, the handler, then output validation once the outermost
//! stage has returned.

use crate::handler::HandlerOptions;
use crate::middleware::{MiddlewareOptions, Next};
use crate::procedure::Procedure;
use crate::signal::CancellationSignal;
use crate::{Context, RpcError, RpcResult};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-call options for [`execute`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Initial context
    pub context: Context,
    /// Raw input; `Null` when the caller sent nothing
    pub input: Value,
    /// Path segments of the procedure
    pub path: Vec<String>,
    /// Caller's cancellation signal
    pub signal: Option<CancellationSignal>,
}

impl CallOptions {
    /// Options with the given input and everything else empty
    pub fn new(input: Value) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    /// Set the initial context
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Set the procedure path
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    /// Set the cancellation signal
    pub fn with_signal(mut self, signal: Option<CancellationSignal>) -> Self {
        self.signal = signal;
        self
    }
}

/// State fixed for the whole call.
struct CallState {
    procedure: Arc<Procedure>,
    input: Value,
    path: Vec<String>,
    signal: Option<CancellationSignal>,
}

/// Execute `procedure` with `options`.
///
/// # Errors
///
/// - `BAD_REQUEST` with `data.issues` when input validation fails (no stage runs)
/// - `INTERNAL_SERVER_ERROR` when output validation fails
/// - any error raised by a middleware or the handler, unmodified
pub async fn execute(procedure: &Arc<Procedure>, options: CallOptions) -> RpcResult<Value> {
    let CallOptions {
        context,
        input,
        path,
        signal,
    } = options;

    trace!(path = ?path, middlewares = procedure.middlewares.len(), "Executing procedure");

    let input = validate_input(procedure, input).await?;
    let state = Arc::new(CallState {
        procedure: Arc::clone(procedure),
        input,
        path,
        signal,
    });

    let output = run_stage(Arc::clone(&state), 0, context).await?;
    let output = validate_output(procedure, output).await?;

    trace!(path = ?state.path, "Procedure completed");
    Ok(output)
}

fn run_stage(state: Arc<CallState>, index: usize, context: Context) -> BoxFuture<'static, RpcResult<Value>> {
    Box::pin(async move {
        match state.procedure.middlewares.get(index) {
            Some(middleware) => {
                let downstream = Arc::clone(&state);
                let next = Next::new(
                    context.clone(),
                    Arc::new(move |merged| run_stage(Arc::clone(&downstream), index + 1, merged)),
                );
                let options = MiddlewareOptions {
                    input: state.input.clone(),
                    path: state.path.clone(),
                    procedure: Arc::clone(&state.procedure),
                    signal: state.signal.clone(),
                };

                trace!(stage = index, "Entering middleware");
                let result = middleware.handle(context, options, next).await?;
                Ok(result.output)
            }
            None => {
                let options = HandlerOptions {
                    context,
                    input: state.input.clone(),
                    path: state.path.clone(),
                    signal: state.signal.clone(),
                };
                (state.procedure.handler)(options).await
            }
        }
    })
}

async fn validate_input(procedure: &Procedure, input: Value) -> RpcResult<Value> {
    let Some(schema) = &procedure.input_schema else {
        return Ok(input);
    };

    schema.validate(input).await.map_err(|issues| {
        debug!(issue_count = issues.len(), "Input validation failed");
        RpcError::input_validation(issues)
    })
}

async fn validate_output(procedure: &Procedure, output: Value) -> RpcResult<Value> {
    let Some(schema) = &procedure.output_schema else {
        return Ok(output);
    };

    schema.validate(output).await.map_err(|issues| {
        debug!(issue_count = issues.len(), "Output validation failed");
        RpcError::output_validation(issues)
    })
}
