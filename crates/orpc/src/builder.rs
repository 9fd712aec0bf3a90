//! oRPC-style procedure builder
//!
//! Every builder method borrows the builder and returns a new one, so a
//! shared base can be extended in several directions:
//!
//! ```rust,ignore
//! use orpc::prelude::*;
//!
//! let public = os();
//! let authed = public.use_middleware(require_user);
//!
//! let find = public
//!     .input_type::<FindPlanet>()
//!     .handler(|opts: HandlerOptions<FindPlanet>| async move { find_planet(opts.input.id) });
//!
//! let create = authed
//!     .input_type::<NewPlanet>()
//!     .output_type::<Planet>()
//!     .handler(create_planet);
//! ```

use crate::handler::{self, Handler, HandlerOptions};
use crate::middleware::{MiddlewareFn, MiddlewareOptions, MiddlewareResult, Next};
use crate::procedure::{Procedure, ProcedureMeta};
use crate::schema::{DynSchema, Schema, TypedSchema};
use crate::validation::Validate;
use crate::{Context, RpcResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Initial, empty builder.
pub fn os() -> Builder {
    Builder::default()
}

/// Immutable procedure builder.
#[derive(Clone, Default)]
pub struct Builder {
    middlewares: Vec<MiddlewareFn>,
    input_schema: Option<DynSchema>,
    output_schema: Option<DynSchema>,
    meta: ProcedureMeta,
}

impl Builder {
    /// Append a middleware closure or async fn.
    pub fn use_middleware<F, Fut>(&self, middleware: F) -> Self
    where
        F: Fn(Context, MiddlewareOptions, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResult<MiddlewareResult>> + Send + 'static,
    {
        self.with_middleware(Arc::new(middleware))
    }

    /// Append an already boxed middleware.
    pub fn with_middleware(&self, middleware: MiddlewareFn) -> Self {
        let mut next = self.clone();
        next.middlewares.push(middleware);
        next
    }

    /// Set the input schema.
    pub fn input(&self, schema: impl Schema + 'static) -> Self {
        let mut next = self.clone();
        next.input_schema = Some(Arc::new(schema));
        next
    }

    /// Set the input schema to a Rust type.
    pub fn input_type<T>(&self) -> Self
    where
        T: DeserializeOwned + Serialize + Validate + Send + 'static,
    {
        self.input(TypedSchema::<T>::new())
    }

    /// Set the output schema.
    pub fn output(&self, schema: impl Schema + 'static) -> Self {
        let mut next = self.clone();
        next.output_schema = Some(Arc::new(schema));
        next
    }

    /// Set the output schema to a Rust type.
    pub fn output_type<T>(&self) -> Self
    where
        T: DeserializeOwned + Serialize + Validate + Send + 'static,
    {
        self.output(TypedSchema::<T>::new())
    }

    /// Attach metadata.
    pub fn meta(&self, meta: ProcedureMeta) -> Self {
        let mut next = self.clone();
        next.meta = meta;
        next
    }

    /// Finish with a typed handler.
    pub fn handler<Input, Output, H>(&self, handler: H) -> Procedure
    where
        Input: DeserializeOwned + Send + 'static,
        Output: Serialize + Send + 'static,
        H: Handler<Input, Output>,
    {
        self.build(handler::into_boxed(handler))
    }

    /// Finish with a handler over raw JSON values.
    pub fn value_handler<F, Fut>(&self, handler: F) -> Procedure
    where
        F: Fn(HandlerOptions<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResult<Value>> + Send + 'static,
    {
        self.build(handler::from_value_fn(handler))
    }

    fn build(&self, handler: handler::BoxedHandler) -> Procedure {
        Procedure {
            middlewares: self.middlewares.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
            handler,
            meta: self.meta.clone(),
        }
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("middlewares", &self.middlewares.len())
            .field("input_schema", &self.input_schema.is_some())
            .field("output_schema", &self.output_schema.is_some())
            .field("meta", &self.meta)
            .finish()
    }
}
