//! Pipeline tests - middleware ordering, context merging and validation

use crate::handler::HandlerOptions;
use crate::middleware::{MiddlewareOptions, MiddlewareResult, Next};
use crate::pipeline::{CallOptions, execute};
use crate::schema::schema_fn;
use crate::signal::CancellationSignal;
use crate::validation::Issue;
use crate::{Context, RpcError, RpcErrorCode, os};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().unwrap().clone()
}

// =============================================================================
// Ordering and Context
// =============================================================================

#[tokio::test]
async fn test_middlewares_wrap_in_declaration_order() {
    let events = log();
    let (first, second, inner) = (events.clone(), events.clone(), events.clone());

    let procedure = Arc::new(
        os().use_middleware(move |ctx: Context, _: MiddlewareOptions, next: Next| {
            let events = first.clone();
            async move {
                events.lock().unwrap().push("before 1".into());
                let result = next.run(ctx).await;
                events.lock().unwrap().push("after 1".into());
                result
            }
        })
        .use_middleware(move |_: Context, _: MiddlewareOptions, next: Next| {
            let events = second.clone();
            async move {
                events.lock().unwrap().push("before 2".into());
                let result = next.proceed().await;
                events.lock().unwrap().push("after 2".into());
                result
            }
        })
        .value_handler(move |_: HandlerOptions<Value>| {
            let events = inner.clone();
            async move {
                events.lock().unwrap().push("handler".into());
                Ok(json!("done"))
            }
        }),
    );

    let output = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap();
    assert_eq!(output, json!("done"));
    assert_eq!(
        entries(&events),
        vec!["before 1", "before 2", "handler", "after 2", "after 1"]
    );
}

#[tokio::test]
async fn test_context_merges_left_to_right() {
    let procedure = Arc::new(
        os().use_middleware(|_: Context, _: MiddlewareOptions, next: Next| async move {
            next.run(Context::new().with("a", 1i32).with("from", "first".to_string())).await
        })
        .use_middleware(|ctx: Context, _: MiddlewareOptions, next: Next| async move {
            assert_eq!(ctx.get::<i32>("a"), Some(&1));
            next.run(Context::new().with("a", 2i32).with("b", 3i32)).await
        })
        .value_handler(|opts: HandlerOptions<Value>| async move {
            let ctx = &opts.context;
            Ok(json!({
                "a": ctx.get::<i32>("a"),
                "b": ctx.get::<i32>("b"),
                "from": ctx.get::<String>("from"),
                "root": ctx.get::<String>("root"),
            }))
        }),
    );

    let options = CallOptions::new(Value::Null).with_context(Context::new().with("root", "r".to_string()));
    let output = execute(&procedure, options).await.unwrap();
    assert_eq!(output, json!({ "a": 2, "b": 3, "from": "first", "root": "r" }));
}

#[tokio::test]
async fn test_next_returns_the_stage_partial() {
    let seen = Arc::new(Mutex::new(Vec::<Vec<String>>::new()));
    let recorder = seen.clone();

    let procedure = Arc::new(
        os().use_middleware(move |ctx: Context, _: MiddlewareOptions, next: Next| {
            let recorder = recorder.clone();
            async move {
                let result = next.run(ctx.merge(&Context::new().with("mine", true))).await?;
                let mut keys: Vec<String> = result.context.keys().map(str::to_string).collect();
                keys.sort();
                recorder.lock().unwrap().push(keys);
                Ok(result)
            }
        })
        .use_middleware(|_: Context, _: MiddlewareOptions, next: Next| async move {
            next.run(Context::new().with("downstream", true)).await
        })
        .value_handler(|_: HandlerOptions<Value>| async { Ok(Value::Null) }),
    );

    let options = CallOptions::new(Value::Null).with_context(Context::new().with("root", 0u8));
    execute(&procedure, options).await.unwrap();

    assert_eq!(seen.lock().unwrap()[0], vec!["mine".to_string(), "root".to_string()]);
}

#[tokio::test]
async fn test_short_circuit_skips_remaining_stages() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (mw_calls, handler_calls) = (calls.clone(), calls.clone());

    let procedure = Arc::new(
        os().use_middleware(|_: Context, _: MiddlewareOptions, _: Next| async move {
            Ok(MiddlewareResult::new(json!("cached")))
        })
        .use_middleware(move |_: Context, _: MiddlewareOptions, next: Next| {
            mw_calls.fetch_add(1, Ordering::SeqCst);
            async move { next.proceed().await }
        })
        .value_handler(move |_: HandlerOptions<Value>| {
            handler_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(json!("fresh")) }
        }),
    );

    let output = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap();
    assert_eq!(output, json!("cached"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_next_can_run_twice_for_retries() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let procedure = Arc::new(
        os().use_middleware(|_: Context, _: MiddlewareOptions, next: Next| async move {
            match next.proceed().await {
                Ok(result) => Ok(result),
                Err(_) => next.proceed().await,
            }
        })
        .value_handler(move |_: HandlerOptions<Value>| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(RpcError::new("FLAKY", "try again"))
                } else {
                    Ok(json!(attempt))
                }
            }
        }),
    );

    let output = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap();
    assert_eq!(output, json!(1));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Validation
// =============================================================================

fn positive_id() -> impl crate::schema::Schema {
    schema_fn(|value: Value| match value.get("id").and_then(Value::as_i64) {
        Some(id) if id > 0 => Ok(json!({ "id": id, "checked": true })),
        Some(_) => Err(vec![Issue::new(["id"], "Must be positive", "too_small")]),
        None => Err(vec![Issue::required("id")]),
    })
}

#[tokio::test]
async fn test_input_validation_failure_runs_no_stage() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let procedure = Arc::new(
        os().input(positive_id())
            .use_middleware(move |_: Context, _: MiddlewareOptions, next: Next| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { next.proceed().await }
            })
            .value_handler(|opts: HandlerOptions<Value>| async move { Ok(opts.input) }),
    );

    let err = execute(&procedure, CallOptions::new(json!({ "id": -1 }))).await.unwrap_err();
    assert_eq!(*err.code(), RpcErrorCode::BadRequest);
    assert_eq!(err.status(), 400);
    assert_eq!(err.data().unwrap()["issues"][0]["path"], json!(["id"]));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stages_see_validated_input() {
    let procedure = Arc::new(
        os().input(positive_id())
            .use_middleware(|_: Context, options: MiddlewareOptions, next: Next| async move {
                assert_eq!(options.input["checked"], true);
                next.proceed().await
            })
            .value_handler(|opts: HandlerOptions<Value>| async move { Ok(opts.input) }),
    );

    let output = execute(&procedure, CallOptions::new(json!({ "id": 7 }))).await.unwrap();
    assert_eq!(output, json!({ "id": 7, "checked": true }));
}

#[tokio::test]
async fn test_output_validated_once_after_outermost_stage() {
    let validations = Arc::new(AtomicUsize::new(0));
    let counter = validations.clone();
    let output_schema = schema_fn(move |value: Value| {
        counter.fetch_add(1, Ordering::SeqCst);
        if value.is_string() {
            Ok(value)
        } else {
            Err(vec![Issue::root("Expected a string", "invalid_type")])
        }
    });

    let procedure = Arc::new(
        os().output(output_schema)
            .use_middleware(|_: Context, _: MiddlewareOptions, next: Next| async move {
                let mut result = next.proceed().await?;
                result.output = json!(format!("wrapped {}", result.output));
                Ok(result)
            })
            .use_middleware(|_: Context, _: MiddlewareOptions, next: Next| async move { next.proceed().await })
            .value_handler(|_: HandlerOptions<Value>| async { Ok(json!(42)) }),
    );

    let output = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap();
    assert_eq!(output, json!("wrapped 42"));
    assert_eq!(validations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_output_validation_failure_is_internal_server_error() {
    let procedure = Arc::new(
        os().output(schema_fn(|_| Err(vec![Issue::root("nope", "custom")])))
            .value_handler(|_: HandlerOptions<Value>| async { Ok(json!(1)) }),
    );

    let err = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap_err();
    assert_eq!(*err.code(), RpcErrorCode::InternalServerError);
    assert_eq!(err.status(), 500);
}

// =============================================================================
// Errors, Paths and Signals
// =============================================================================

#[tokio::test]
async fn test_errors_propagate_unmodified() {
    let procedure = Arc::new(os().value_handler(|_: HandlerOptions<Value>| async {
        Err(RpcError::new("PLANET_GONE", "It left")
            .with_status(410)
            .unwrap_or_else(|_| RpcError::internal("bad status"))
            .with_data(json!({ "planet": "pluto" })))
    }));

    let err = execute(&procedure, CallOptions::new(Value::Null)).await.unwrap_err();
    assert_eq!(err.code().as_str(), "PLANET_GONE");
    assert_eq!(err.status(), 410);
    assert_eq!(err.message(), "It left");
    assert_eq!(err.data(), Some(&json!({ "planet": "pluto" })));
}

#[tokio::test]
async fn test_typed_handler_rejects_undeserializable_input() {
    #[derive(serde::Deserialize)]
    struct Find {
        id: u32,
    }

    let procedure = Arc::new(os().handler(|opts: HandlerOptions<Find>| async move { Ok(opts.input.id * 2) }));

    assert_eq!(execute(&procedure, CallOptions::new(json!({ "id": 21 }))).await.unwrap(), json!(42));
    let err = execute(&procedure, CallOptions::new(json!({ "id": "x" }))).await.unwrap_err();
    assert_eq!(err.status(), 400);
}

#[tokio::test]
async fn test_path_and_signal_reach_every_stage() {
    let signal = CancellationSignal::new();
    signal.cancel();

    let procedure = Arc::new(
        os().use_middleware(|_: Context, options: MiddlewareOptions, next: Next| async move {
            assert_eq!(options.dotted_path(), "planet.find");
            assert!(options.signal.as_ref().is_some_and(|s| s.is_cancelled()));
            next.proceed().await
        })
        .value_handler(|opts: HandlerOptions<Value>| async move {
            Ok(json!({
                "path": opts.path,
                "cancelled": opts.signal.map(|s| s.is_cancelled()),
            }))
        }),
    );

    let options = CallOptions::new(Value::Null)
        .with_path(vec!["planet".into(), "find".into()])
        .with_signal(Some(signal));
    let output = execute(&procedure, options).await.unwrap();
    assert_eq!(output, json!({ "path": ["planet", "find"], "cancelled": true }));
}
