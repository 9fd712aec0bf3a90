//! Middleware support for request/response processing
//!
//! Middleware wraps the rest of a procedure's pipeline. It receives the
//! current [`Context`], read-only [`MiddlewareOptions`] and a [`Next`] handle.
//! Calling [`Next::run`] with a partial context merges it onto the received
//! context and runs the remaining stages; not calling it short-circuits them.

use crate::procedure::Procedure;
use crate::signal::CancellationSignal;
use crate::{Context, RpcResult};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Read-only view of the call, handed to every middleware.
#[derive(Clone)]
pub struct MiddlewareOptions {
    /// Input after input validation. Identical for every stage.
    pub input: Value,
    /// Path segments of the procedure (e.g. `["planet", "find"]`)
    pub path: Vec<String>,
    /// The procedure being executed
    pub procedure: Arc<Procedure>,
    /// Caller's cancellation signal, if any
    pub signal: Option<CancellationSignal>,
}

impl MiddlewareOptions {
    /// The path joined with dots
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Debug for MiddlewareOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareOptions")
            .field("input", &self.input)
            .field("path", &self.path)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

/// Value produced by advancing past a stage.
///
/// `context` is the partial context the stage passed to `next`, not the
/// merged context the downstream stages saw.
#[derive(Debug, Clone)]
pub struct MiddlewareResult {
    /// Output of the downstream chain
    pub output: Value,
    /// Partial context applied by the stage
    pub context: Context,
}

impl MiddlewareResult {
    /// Result with an empty context, used when short-circuiting.
    pub fn new(output: Value) -> Self {
        Self {
            output,
            context: Context::new(),
        }
    }
}

pub(crate) type NextFn = Arc<dyn Fn(Context) -> BoxFuture<'static, RpcResult<Value>> + Send + Sync>;

/// Handle to the remaining stages of the pipeline.
///
/// `Next` can be invoked more than once (e.g. by a retry middleware); each
/// invocation re-runs every downstream stage.
#[derive(Clone)]
pub struct Next {
    received: Context,
    run: NextFn,
}

impl Next {
    pub(crate) fn new(received: Context, run: NextFn) -> Self {
        Self { received, run }
    }

    /// Merge `partial` onto the received context and run the rest of the chain.
    pub async fn run(&self, partial: Context) -> RpcResult<MiddlewareResult> {
        let merged = self.received.merge(&partial);
        let output = (self.run)(merged).await?;
        Ok(MiddlewareResult {
            output,
            context: partial,
        })
    }

    /// Run the rest of the chain without changing the context.
    pub async fn proceed(&self) -> RpcResult<MiddlewareResult> {
        self.run(Context::new()).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("received", &self.received)
            .finish_non_exhaustive()
    }
}

/// Trait for implementing custom middleware
pub trait Middleware: Send + Sync + 'static {
    /// Process the call, optionally calling `next`
    fn handle(
        &self,
        ctx: Context,
        options: MiddlewareOptions,
        next: Next,
    ) -> BoxFuture<'static, RpcResult<MiddlewareResult>>;
}

/// Shared, type-erased middleware as stored in a procedure.
pub type MiddlewareFn = Arc<dyn Middleware>;

/// Async functions and closures are middleware.
///
/// ```rust,ignore
/// let timing = |ctx: Context, opts: MiddlewareOptions, next: Next| async move {
///     let start = std::time::Instant::now();
///     let result = next.run(Context::new()).await;
///     tracing::debug!(path = %opts.dotted_path(), elapsed = ?start.elapsed());
///     result
/// };
/// ```
impl<F, Fut> Middleware for F
where
    F: Fn(Context, MiddlewareOptions, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<MiddlewareResult>> + Send + 'static,
{
    fn handle(
        &self,
        ctx: Context,
        options: MiddlewareOptions,
        next: Next,
    ) -> BoxFuture<'static, RpcResult<MiddlewareResult>> {
        Box::pin(self(ctx, options, next))
    }
}

/// Create middleware from an async function
///
/// ```rust,ignore
/// async fn require_user(ctx: Context, _: MiddlewareOptions, next: Next) -> RpcResult<MiddlewareResult> {
///     if !ctx.contains("user") {
///         return Err(RpcError::unauthorized("Sign in first"));
///     }
///     next.proceed().await
/// }
///
/// let middleware = from_fn(require_user);
/// ```
pub fn from_fn<F, Fut>(f: F) -> MiddlewareFn
where
    F: Fn(Context, MiddlewareOptions, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<MiddlewareResult>> + Send + 'static,
{
    Arc::new(f)
}
