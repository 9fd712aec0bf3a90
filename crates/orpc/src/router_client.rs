//! In-process router client
//!
//! Same navigation as [`Client`](crate::client::Client), but calls go straight
//! into the dispatch pipeline without any transport. The procedure at a path
//! is looked up once, when the client for that path is created.

use crate::client::ClientOptions;
use crate::pipeline::{self, CallOptions};
use crate::procedure::Procedure;
use crate::router::Router;
use crate::{Context, RpcError, RpcResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Navigable client bound to a local router.
#[derive(Clone, Debug)]
pub struct RouterClient {
    router: Arc<Router>,
    path: Vec<String>,
    procedure: Option<Arc<Procedure>>,
    context: Context,
}

fn bind(router: &Router, path: &[String]) -> Option<Arc<Procedure>> {
    match router.get(path) {
        Some(Router::Procedure(procedure)) => Some(Arc::clone(procedure)),
        _ => None,
    }
}

impl RouterClient {
    /// Root client calling into `router` with `context`.
    pub fn new(router: impl Into<Arc<Router>>, context: Context) -> Self {
        let router = router.into();
        let procedure = bind(&router, &[]);
        Self {
            router,
            path: Vec::new(),
            procedure,
            context,
        }
    }

    /// A client for the child `key`. `self` is unchanged.
    pub fn at(&self, key: impl Into<String>) -> RouterClient {
        let mut path = self.path.clone();
        path.push(key.into());
        RouterClient {
            procedure: bind(&self.router, &path),
            router: Arc::clone(&self.router),
            path,
            context: self.context.clone(),
        }
    }

    /// Accumulated path
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Whether the node at this path is a procedure
    pub fn is_callable(&self) -> bool {
        self.procedure.is_some()
    }

    /// The procedure this client is bound to
    pub fn procedure(&self) -> Option<&Arc<Procedure>> {
        self.procedure.as_ref()
    }

    /// Run the procedure at this path.
    ///
    /// # Errors
    ///
    /// `NOT_FOUND` when the path is not a procedure, otherwise whatever the
    /// pipeline returns.
    pub async fn call(&self, input: Value, options: ClientOptions) -> RpcResult<Value> {
        let Some(procedure) = &self.procedure else {
            debug!(path = ?self.path, "Router client called a non-procedure path");
            return Err(RpcError::not_found(format!(
                "Procedure not found: {}",
                self.path.join(".")
            )));
        };

        let options = CallOptions::new(input)
            .with_context(self.context.clone())
            .with_path(self.path.clone())
            .with_signal(options.signal);
        pipeline::execute(procedure, options).await
    }

    /// Typed call with default options.
    pub async fn call_typed<I, O>(&self, input: &I) -> RpcResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        let output = self.call(input, ClientOptions::default()).await?;
        serde_json::from_value(output).map_err(|e| {
            RpcError::internal_server_error("Failed to decode procedure output").with_cause(e.to_string())
        })
    }
}
