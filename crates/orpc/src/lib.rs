#![warn(missing_docs)]
//! # orpc
//!
//! A typed RPC dispatch engine: procedures with validated input and output,
//! composable middleware, nested routers, and two wire profiles.
//!
//! - **JSON/RPC**: `POST {prefix}/{path}` with a JSON body, served by
//!   [`JsonHandler`](server::JsonHandler) and called through
//!   [`JsonLink`](link::JsonLink).
//! - **Contract/REST**: procedures declared with an HTTP method, a path
//!   template and per-status outputs ([`contract`]), served by
//!   [`ContractHandler`](server::ContractHandler) and called through
//!   [`ContractLink`](link::ContractLink).
//!
//! ## Architecture
//!
//! ```text
//! Client ──Link──► HttpTransport ═══ wire ═══► RequestHandler ──► Router
//!                                                                   │
//!                                   input schema ◄──────────────────┘
//!                                        │
//!                                        ▼
//!                        middleware 0 ► middleware 1 ► … ► handler
//!                                        │
//!                                        ▼
//!                                  output schema
//! ```
//!
//! ## Quick Start
//!
//! ### 1. Define procedures
//!
//! ```rust,ignore
//! use orpc::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct FindPlanet { id: u32 }
//!
//! let find = os()
//!     .input_type::<FindPlanet>()
//!     .handler(|opts: HandlerOptions<FindPlanet>| async move {
//!         planets::find(opts.input.id).ok_or_else(|| RpcError::not_found("Planet not found"))
//!     });
//! ```
//!
//! ### 2. Build a router
//!
//! ```rust,ignore
//! let router = Router::new().nest("planet", Router::new().procedure("find", find));
//! ```
//!
//! ### 3. Serve it
//!
//! ```rust,ignore
//! let handler = JsonHandler::with_config(router, HandlerConfig::new().with_prefix("/rpc"))?;
//! let app = axum::Router::new().merge(rpc_service(handler, Context::new(), 1024 * 1024));
//! ```
//!
//! ### 4. Call it
//!
//! ```rust,ignore
//! let client = Client::new(JsonLink::new(LinkConfig::new("http://localhost:3000/rpc"), ReqwestTransport::new()));
//! let planet: Planet = client.at("planet").at("find").call_typed(&json!({ "id": 1 })).await?;
//! ```
//!
//! ## Error Handling
//!
//! Procedures fail with [`RpcError`], which carries a wire code, an HTTP
//! status outside `200..400`, a message and optional data. Validation
//! failures become `BAD_REQUEST` (input) or `INTERNAL_SERVER_ERROR` (output);
//! anything unexpected, including a panic, reaches the wire as a generic
//! `INTERNAL_ERROR`.

mod builder;
pub mod client;
pub mod config;
mod context;
pub mod contract;
pub mod encoding;
mod error;
mod handler;
pub mod http;
pub mod link;
pub mod logging;
pub mod middleware;
pub mod pipeline;
mod procedure;
mod router;
mod router_client;
pub mod schema;
pub mod server;
mod signal;
pub mod validation;

#[cfg(test)]
mod tests;

// Public API
pub use builder::{Builder, os};
pub use client::{Client, ClientError, ClientOptions};
pub use config::{ConfigValidationError, HandlerConfig, LinkConfig};
pub use context::{Context, SharedValue};
pub use error::{
    InvalidErrorStatus, RpcError, RpcErrorCode, RpcErrorJson, RpcResult, ValidationError, is_error_json,
    is_error_status,
};
pub use handler::{Handler, HandlerOptions};
pub use middleware::{Middleware, MiddlewareFn, MiddlewareOptions, MiddlewareResult, Next, from_fn};
pub use procedure::{Procedure, ProcedureMeta};
pub use router::Router;
pub use router_client::RouterClient;
pub use schema::{DynSchema, Schema, TypedSchema, schema_fn};
pub use signal::{CancellationReason, CancellationSignal};
pub use validation::{Issue, Validate, ValidationResult, ValidationRules};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use orpc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{Client, ClientError, ClientOptions};
    pub use crate::config::{HandlerConfig, LinkConfig};
    pub use crate::contract::{ContractResponse, RouteConfig, StructuredInputSchema, oc};
    pub use crate::link::{ContractLink, JsonLink, Link};
    pub use crate::server::{ContractHandler, Handlers, JsonHandler, RequestHandler};
    pub use crate::{
        Context, Handler, HandlerOptions, Issue, MiddlewareOptions, MiddlewareResult, Next, Procedure,
        ProcedureMeta, Router, RouterClient, RpcError, RpcErrorCode, RpcResult, Schema, TypedSchema, Validate,
        ValidationRules, os,
    };

    #[cfg(feature = "reqwest")]
    pub use crate::link::ReqwestTransport;
    #[cfg(feature = "axum")]
    pub use crate::server::rpc_service;

    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
