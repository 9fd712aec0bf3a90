//! RPC Handlers
//!
//! Procedures are registered in [`create_router`].

use super::context::{DEMO_TOKEN, current_user, db, demo_user};
use super::middleware::{require_user, retry};
use super::*;
use orpc::logging::{LogConfig, logging_middleware};
use orpc::{Builder, ProcedureMeta};

// =============================================================================
// Builders
// =============================================================================

/// Base builder for public procedures: structured call logging.
pub fn public() -> Builder {
    os().with_middleware(logging_middleware(
        LogConfig::new()
            .redact_field("token")
            .exclude_path("health"),
    ))
}

/// Builder for procedures that need a signed-in user.
pub fn authed() -> Builder {
    public().use_middleware(require_user)
}

// =============================================================================
// Router
// =============================================================================

/// Create the application router
pub fn create_router() -> Router {
    Router::new()
        .procedure("health", public().value_handler(|_: HandlerOptions<Value>| async {
            Ok(json!({ "status": "ok" }))
        }))
        .nest("planet", planet_router())
        .nest("auth", auth_router())
}

/// Planet sub-router
fn planet_router() -> Router {
    let tagged = |summary: &str| ProcedureMeta::new().summary(summary).tag("planets");

    Router::new()
        .procedure(
            "list",
            public()
                .with_middleware(retry(3))
                .input_type::<ListPlanets>()
                .output_type::<Vec<Planet>>()
                .meta(tagged("List planets"))
                .handler(list_planets),
        )
        .procedure(
            "create",
            authed()
                .input_type::<NewPlanet>()
                .output_type::<Planet>()
                .meta(tagged("Create a planet"))
                .handler(create_planet),
        )
        .procedure(
            "find",
            public()
                .with_middleware(retry(3))
                .input_type::<FindPlanet>()
                .output_type::<Planet>()
                .meta(tagged("Find a planet"))
                .handler(find_planet),
        )
        .procedure(
            "update",
            authed()
                .input_type::<UpdatePlanet>()
                .output_type::<Planet>()
                .meta(tagged("Update a planet"))
                .handler(update_planet),
        )
}

/// Auth sub-router
fn auth_router() -> Router {
    Router::new()
        .procedure(
            "signup",
            public().input_type::<NewUser>().output_type::<User>().handler(signup),
        )
        .procedure(
            "signin",
            public().input_type::<Credentials>().output_type::<Token>().handler(signin),
        )
        .procedure("me", authed().output_type::<User>().handler(me))
}

// =============================================================================
// Planet Handlers
// =============================================================================

async fn list_planets(opts: HandlerOptions<ListPlanets>) -> RpcResult<Vec<Planet>> {
    Ok(db(&opts.context)?.list(&opts.input).await)
}

async fn create_planet(opts: HandlerOptions<NewPlanet>) -> RpcResult<Planet> {
    let user = current_user(&opts.context)?;
    db(&opts.context)?.create(opts.input, user).await
}

async fn find_planet(opts: HandlerOptions<FindPlanet>) -> RpcResult<Planet> {
    db(&opts.context)?
        .find(&opts.input)
        .await
        .ok_or_else(|| RpcError::not_found("Planet not found"))
}

async fn update_planet(opts: HandlerOptions<UpdatePlanet>) -> RpcResult<Planet> {
    db(&opts.context)?
        .update(opts.input)
        .await
        .ok_or_else(|| RpcError::not_found("Planet not found"))
}

// =============================================================================
// Auth Handlers
// =============================================================================

async fn signup(opts: HandlerOptions<NewUser>) -> RpcResult<User> {
    Ok(User {
        id: uuid::Uuid::now_v7().to_string(),
        email: opts.input.email,
        name: opts.input.name,
    })
}

async fn signin(opts: HandlerOptions<Credentials>) -> RpcResult<Token> {
    if opts.input.email != demo_user().email {
        return Err(RpcError::unauthorized("Unknown email or wrong password"));
    }
    Ok(Token {
        token: DEMO_TOKEN.to_string(),
    })
}

async fn me(opts: HandlerOptions<Value>) -> RpcResult<User> {
    current_user(&opts.context).cloned()
}
