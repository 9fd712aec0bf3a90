use crate::client::ClientOptions;
use crate::handler::HandlerOptions;
use crate::middleware::{MiddlewareOptions, Next};
use crate::{Context, Procedure, Router, RouterClient, RpcErrorCode, os};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

fn echo() -> Procedure {
    os().value_handler(|opts: HandlerOptions<Value>| async move { Ok(opts.input) })
}

fn constant(value: &'static str) -> Procedure {
    os().value_handler(move |_: HandlerOptions<Value>| async move { Ok(json!(value)) })
}

fn planets() -> Router {
    Router::new()
        .nest(
            "planet",
            Router::new()
                .procedure("list", constant("list"))
                .procedure("find", constant("find"))
                .nest("moon", Router::new().procedure("list", constant("moons"))),
        )
        .procedure("health", constant("ok"))
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_resolve_reaches_leaves_only() {
    let router = planets();

    assert!(router.resolve(&["planet", "find"]).is_some());
    assert!(router.resolve(&["planet", "moon", "list"]).is_some());
    assert!(router.resolve(&["health"]).is_some());

    assert!(router.resolve(&["planet"]).is_none());
    assert!(router.resolve(&["planet", "moon"]).is_none());
    assert!(router.resolve::<&str>(&[]).is_none());
}

#[test]
fn test_resolve_rejects_unknown_and_overlong_paths() {
    let router = planets();

    assert!(router.resolve(&["planet", "delete"]).is_none());
    assert!(router.resolve(&["health", "extra"]).is_none());
    assert!(router.resolve(&["Planet", "find"]).is_none());
}

#[test]
fn test_get_returns_sub_trees() {
    let router = planets();

    let planet = router.get(&["planet"]).unwrap();
    assert!(!planet.is_procedure());
    assert_eq!(planet.len(), 3);
    assert!(router.get(&["health"]).unwrap().is_procedure());
    assert!(router.get(&["nope"]).is_none());
}

#[test]
fn test_procedures_lists_dotted_paths_sorted() {
    assert_eq!(
        planets().procedures(),
        vec!["health", "planet.find", "planet.list", "planet.moon.list"]
    );
    assert_eq!(planets().len(), 4);
    assert!(Router::new().is_empty());
}

#[test]
fn test_merge_prefers_the_other_router() {
    let merged = planets().merge(
        Router::new()
            .procedure("health", constant("replaced"))
            .procedure("version", constant("1.0")),
    );

    assert_eq!(merged.procedures(), vec!["health", "planet.find", "planet.list", "planet.moon.list", "version"]);
}

#[test]
fn test_merge_ignores_bare_procedure() {
    let merged = planets().merge(Router::from(echo()));
    assert_eq!(merged.len(), 4);
}

#[test]
fn test_procedure_on_a_leaf_replaces_it() {
    let router = Router::from(echo()).procedure("inner", echo());
    assert!(!router.is_procedure());
    assert!(router.resolve(&["inner"]).is_some());
}

// =============================================================================
// Router Client
// =============================================================================

#[tokio::test]
async fn test_router_client_calls_nested_procedure() {
    let client = RouterClient::new(planets(), Context::new());

    let output = client.at("planet").at("moon").at("list").call(Value::Null, ClientOptions::default()).await;
    assert_eq!(output.unwrap(), json!("moons"));
}

#[tokio::test]
async fn test_router_client_navigation_is_immutable() {
    let root = RouterClient::new(planets(), Context::new());
    let planet = root.at("planet");
    let find = planet.at("find");
    let list = planet.at("list");

    assert!(root.path().is_empty());
    assert_eq!(planet.path(), ["planet"]);
    assert_eq!(find.path(), ["planet", "find"]);
    assert_eq!(list.path(), ["planet", "list"]);
    assert!(!planet.is_callable());
    assert!(find.is_callable());
}

#[test]
fn test_router_client_binds_procedure_on_navigation() {
    let router = std::sync::Arc::new(planets());
    let client = RouterClient::new(std::sync::Arc::clone(&router), Context::new());

    let find = client.at("planet").at("find");
    let bound = find.procedure().unwrap();
    assert!(std::sync::Arc::ptr_eq(bound, router.resolve(&["planet", "find"]).unwrap()));

    assert!(client.procedure().is_none());
    assert!(client.at("planet").procedure().is_none());
    assert!(client.at("health").at("extra").procedure().is_none());
}

#[tokio::test]
async fn test_router_client_not_found() {
    let client = RouterClient::new(planets(), Context::new());

    let err = client.at("planet").call(Value::Null, ClientOptions::default()).await.unwrap_err();
    assert_eq!(*err.code(), RpcErrorCode::NotFound);
    assert_eq!(err.message(), "Procedure not found: planet");

    let err = client.at("sun").at("find").call(Value::Null, ClientOptions::default()).await.unwrap_err();
    assert_eq!(err.status(), 404);
}

#[tokio::test]
async fn test_router_client_passes_context_and_path() {
    let whoami = os()
        .use_middleware(|ctx: Context, opts: MiddlewareOptions, next: Next| async move {
            let user = ctx.get::<String>("user").cloned().unwrap_or_default();
            next.run(Context::new().with("line", format!("{} at {}", user, opts.dotted_path())))
                .await
        })
        .value_handler(|opts: HandlerOptions<Value>| async move {
            Ok(json!(opts.context.get::<String>("line")))
        });
    let router = Router::new().nest("auth", Router::new().procedure("me", whoami));
    let client = RouterClient::new(router, Context::new().with("user", "ada".to_string()));

    let output = client.at("auth").at("me").call(Value::Null, ClientOptions::default()).await;
    assert_eq!(output.unwrap(), json!("ada at auth.me"));
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Planet {
    id: u32,
    name: String,
}

#[tokio::test]
async fn test_router_client_typed_call() {
    let router = Router::new().procedure("echo", echo());
    let client = RouterClient::new(router, Context::new());

    let mars = Planet {
        id: 4,
        name: "Mars".into(),
    };
    let output: Planet = client.at("echo").call_typed(&mars).await.unwrap();
    assert_eq!(output, mars);

    let err = client.at("echo").call_typed::<_, Planet>(&json!("not a planet")).await.unwrap_err();
    assert_eq!(*err.code(), RpcErrorCode::InternalServerError);
}
