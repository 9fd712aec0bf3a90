//! Application middleware

use super::context::{DEMO_TOKEN, TOKEN_KEY, USER_KEY, demo_user};
use orpc::{Context, MiddlewareFn, MiddlewareOptions, MiddlewareResult, Next, RpcError, RpcResult, from_fn};
use tracing::{debug, warn};

/// Require a valid bearer token and put the signed-in user in the context.
pub async fn require_user(ctx: Context, options: MiddlewareOptions, next: Next) -> RpcResult<MiddlewareResult> {
    let token = ctx.get::<String>(TOKEN_KEY).map(String::as_str);
    if token != Some(DEMO_TOKEN) {
        debug!(path = %options.dotted_path(), has_token = token.is_some(), "Rejected unauthenticated call");
        return Err(RpcError::unauthorized("Missing or invalid token"));
    }
    next.run(Context::new().with(USER_KEY, demo_user())).await
}

/// Re-run the rest of the chain up to `times` more times on server errors.
///
/// Client errors are returned at once since repeating the call cannot fix
/// them.
pub fn retry(times: usize) -> MiddlewareFn {
    from_fn(move |_: Context, options: MiddlewareOptions, next: Next| async move {
        let mut attempt = 0;
        loop {
            match next.proceed().await {
                Err(e) if attempt < times && e.code().is_server_error() => {
                    attempt += 1;
                    warn!(
                        path = %options.dotted_path(),
                        attempt,
                        error_code = %e.code(),
                        "Retrying failed call"
                    );
                }
                result => return result,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orpc::pipeline::{CallOptions, execute};
    use orpc::{HandlerOptions, RpcErrorCode, os};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn flaky(failures: usize, error: RpcError) -> (Arc<orpc::Procedure>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let procedure = os().with_middleware(retry(3)).value_handler(move |_: HandlerOptions<Value>| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            let error = error.clone();
            async move {
                if call < failures {
                    Err(error)
                } else {
                    Ok(json!(call))
                }
            }
        });
        (Arc::new(procedure), calls)
    }

    #[tokio::test]
    async fn test_retry_recovers_from_server_errors() {
        let (procedure, calls) = flaky(2, RpcError::internal_server_error("db busy"));
        let output = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap();
        assert_eq!(output, json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_limit() {
        let (procedure, calls) = flaky(10, RpcError::internal_server_error("db down"));
        let err = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap_err();
        assert_eq!(*err.code(), RpcErrorCode::InternalServerError);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_skips_client_errors() {
        let (procedure, calls) = flaky(1, RpcError::not_found("gone"));
        let err = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_require_user() {
        let procedure = Arc::new(os().use_middleware(require_user).value_handler(|opts: HandlerOptions<Value>| async move {
            Ok(json!(opts.context.get::<crate::rpc::User>(USER_KEY).map(|u| u.name.clone())))
        }));

        let err = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap_err();
        assert_eq!(err.status(), 401);

        let ctx = Context::new().with(TOKEN_KEY, DEMO_TOKEN.to_string());
        let output = execute(&procedure, CallOptions::new(Value::Null).with_context(ctx)).await.unwrap();
        assert_eq!(output, json!("Ada"));
    }
}
