//! Contract builder and contract procedures.
//!
//! ```rust,ignore
//! use orpc::contract::{oc, ContractResponse, RouteConfig, StructuredInputSchema};
//!
//! let find = oc()
//!     .route(RouteConfig::get("/planets/{id}").summary("Find a planet"))?
//!     .input(StructuredInputSchema::new().params(TypedSchema::<PlanetId>::new()))?
//!     .output(200, TypedSchema::<Planet>::new())?
//!     .output(404, TypedSchema::<NotFound>::new())?
//!     .handler(|opts: HandlerOptions<FindInput>| async move {
//!         match find_planet(&opts.input.params.id) {
//!             Some(planet) => Ok(ContractResponse::new(200, json!(planet))),
//!             None => Ok(ContractResponse::new(404, json!({ "message": "not found" }))),
//!         }
//!     })?;
//! ```

use super::ContractBuildError;
use super::input::StructuredInputSchema;
use super::route::{ParsedRoute, RouteConfig, parse_route};
use crate::handler::{self, Handler};
use crate::middleware::{MiddlewareFn, MiddlewareOptions, MiddlewareResult, Next};
use crate::procedure::{Procedure, ProcedureMeta};
use crate::schema::{DynSchema, Schema};
use crate::validation::Issue;
use crate::{Context, RpcResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Lowest and highest valid HTTP status codes.
const STATUS_RANGE: std::ops::RangeInclusive<u16> = 100..=599;

/// Handler result of a contract procedure: a status and its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractResponse<T = Value> {
    /// HTTP status, one of the declared output statuses
    pub status: u16,
    /// Response data
    pub data: T,
}

impl<T> ContractResponse<T> {
    /// Create a response
    pub fn new(status: u16, data: T) -> Self {
        Self { status, data }
    }

    /// `200` with `data`
    pub fn ok(data: T) -> Self {
        Self::new(200, data)
    }
}

/// Output schema of a lowered contract: validates `{status, data}` against
/// the schema declared for `status`.
#[derive(Clone, Default)]
pub(crate) struct StatusOutputSchema {
    outputs: BTreeMap<u16, DynSchema>,
}

#[async_trait]
impl Schema for StatusOutputSchema {
    async fn validate(&self, value: Value) -> Result<Value, Vec<Issue>> {
        let response: ContractResponse<Value> = serde_json::from_value(value)
            .map_err(|e| vec![Issue::root(format!("Invalid contract response: {}", e), "invalid_type")])?;

        let Some(schema) = self.outputs.get(&response.status) else {
            return Err(vec![Issue::new(
                ["status"],
                format!("Status {} is not declared by the contract", response.status),
                "undeclared_status",
            )]);
        };

        let data = schema
            .validate(response.data)
            .await
            .map_err(|issues| issues.into_iter().map(|i| i.nested("data")).collect::<Vec<_>>())?;

        serde_json::to_value(ContractResponse::new(response.status, data))
            .map_err(|e| vec![Issue::root(e.to_string(), "invalid_type")])
    }
}

/// Initial, empty contract builder.
pub fn oc() -> ContractBuilder {
    ContractBuilder::default()
}

/// Immutable builder for contract procedures.
#[derive(Clone, Default)]
pub struct ContractBuilder {
    route: Option<ParsedRoute>,
    input: StructuredInputSchema,
    outputs: BTreeMap<u16, DynSchema>,
    middlewares: Vec<MiddlewareFn>,
    meta: ProcedureMeta,
}

impl ContractBuilder {
    /// Set the HTTP route.
    ///
    /// Clears a previously declared input, since its validity depends on the
    /// route.
    pub fn route(&self, config: RouteConfig) -> Result<Self, ContractBuildError> {
        let route = parse_route(&config)?;
        let mut next = self.clone();
        if next.meta.summary.is_none() {
            next.meta.summary = route.summary.clone();
        }
        if next.meta.description.is_none() {
            next.meta.description = route.description.clone();
        }
        next.route = Some(route);
        next.input = StructuredInputSchema::new();
        Ok(next)
    }

    /// Set the structured input schema.
    ///
    /// # Errors
    ///
    /// - [`ContractBuildError::MissingRoute`] before [`route`](Self::route)
    /// - [`ContractBuildError::BodyNotAllowed`] for a body schema on `GET`/`DELETE`
    /// - [`ContractBuildError::ParamsNotAllowed`] for a params schema on a path
    ///   without placeholders
    pub fn input(&self, schema: StructuredInputSchema) -> Result<Self, ContractBuildError> {
        let route = self.route.as_ref().ok_or(ContractBuildError::MissingRoute)?;
        if schema.has_body() && !route.method.allows_body() {
            return Err(ContractBuildError::BodyNotAllowed(route.method));
        }
        if schema.has_params() && !route.has_params() {
            return Err(ContractBuildError::ParamsNotAllowed(route.path.clone()));
        }
        let mut next = self.clone();
        next.input = schema;
        Ok(next)
    }

    /// Declare the data schema for `status`.
    ///
    /// # Errors
    ///
    /// [`ContractBuildError::InvalidStatus`] outside `100..=599`.
    pub fn output(&self, status: u16, schema: impl Schema + 'static) -> Result<Self, ContractBuildError> {
        if !STATUS_RANGE.contains(&status) {
            return Err(ContractBuildError::InvalidStatus(status));
        }
        let mut next = self.clone();
        next.outputs.insert(status, Arc::new(schema));
        Ok(next)
    }

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

    /// Attach metadata. Route summary and description fill unset fields.
    pub fn meta(&self, meta: ProcedureMeta) -> Self {
        let mut next = self.clone();
        next.meta = meta;
        if let Some(route) = &next.route {
            if next.meta.summary.is_none() {
                next.meta.summary = route.summary.clone();
            }
            if next.meta.description.is_none() {
                next.meta.description = route.description.clone();
            }
        }
        next
    }

    /// Finish with a handler returning [`ContractResponse`].
    ///
    /// # Errors
    ///
    /// [`ContractBuildError::MissingRoute`] if no route was set.
    pub fn handler<Input, Output, H>(&self, handler: H) -> Result<ContractProcedure, ContractBuildError>
    where
        Input: DeserializeOwned + Send + 'static,
        Output: Serialize + Send + 'static,
        H: Handler<Input, ContractResponse<Output>>,
    {
        let route = self.route.clone().ok_or(ContractBuildError::MissingRoute)?;

        let output_schema: Option<DynSchema> = if self.outputs.is_empty() {
            None
        } else {
            Some(Arc::new(StatusOutputSchema {
                outputs: self.outputs.clone(),
            }))
        };

        let procedure = Procedure {
            middlewares: self.middlewares.clone(),
            input_schema: Some(Arc::new(self.input.clone())),
            output_schema,
            handler: handler::into_boxed(handler),
            meta: self.meta.clone(),
        };

        Ok(ContractProcedure {
            route,
            input: self.input.clone(),
            statuses: self.outputs.keys().copied().collect(),
            procedure: Arc::new(procedure),
        })
    }
}

impl fmt::Debug for ContractBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractBuilder")
            .field("route", &self.route)
            .field("input", &self.input)
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// An HTTP-aware procedure: a route, a structured input, declared output
/// statuses and the lowered [`Procedure`] that executes it.
#[derive(Clone, Debug)]
pub struct ContractProcedure {
    route: ParsedRoute,
    input: StructuredInputSchema,
    statuses: Vec<u16>,
    procedure: Arc<Procedure>,
}

impl ContractProcedure {
    /// The parsed route
    pub fn route(&self) -> &ParsedRoute {
        &self.route
    }

    /// The structured input schema
    pub fn input_schema(&self) -> &StructuredInputSchema {
        &self.input
    }

    /// Declared output statuses, ascending
    pub fn statuses(&self) -> &[u16] {
        &self.statuses
    }

    /// The regular procedure running this contract.
    ///
    /// Its input is the structured input object and its output the
    /// `{status, data}` pair, so it can be mounted in a
    /// [`Router`](crate::Router) and called over the JSON profile.
    pub fn to_procedure(&self) -> Arc<Procedure> {
        Arc::clone(&self.procedure)
    }
}

impl From<ContractProcedure> for Arc<Procedure> {
    fn from(contract: ContractProcedure) -> Self {
        contract.procedure
    }
}
