//! Contract-first procedures
//!
//! A contract procedure adds an HTTP face to a regular procedure: a method
//! and path template, a structured input split into `params`, `query`,
//! `body` and `headers`, and one output schema per response status. The
//! contract is lowered into a [`Procedure`](crate::Procedure) so the same
//! middleware pipeline runs it.

mod input;
mod procedure;
mod route;

pub use input::{RawInputParts, StructuredInputSchema, assemble_input};
pub use procedure::{ContractBuilder, ContractProcedure, ContractResponse, oc};
pub use route::{ParsedRoute, RouteConfig, extract_path_params, matches_route, parse_route};

use crate::http::HttpMethod;
use thiserror::Error;

/// Contract declaration mistakes, reported while building.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractBuildError {
    /// `input` or `handler` called before `route`
    #[error("A route must be declared before input or handler")]
    MissingRoute,
    /// The route path does not compile to a valid pattern
    #[error("Invalid route pattern '{path}': {reason}")]
    InvalidRoutePattern {
        /// Route template
        path: String,
        /// Regex compile error
        reason: String,
    },
    /// A body schema on a method without a body
    #[error("{0} routes cannot declare a body schema")]
    BodyNotAllowed(HttpMethod),
    /// A params schema on a path without placeholders
    #[error("Route '{0}' has no path parameters to validate")]
    ParamsNotAllowed(String),
    /// An output status outside 100..=599
    #[error("Invalid HTTP status code: {0}")]
    InvalidStatus(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerOptions;
    use crate::pipeline::{CallOptions, execute};
    use crate::schema::schema_fn;
    use crate::validation::Issue;
    use crate::RpcError;
    use serde_json::{Value, json};

    fn any() -> impl crate::schema::Schema {
        schema_fn(Ok)
    }

    fn string_data() -> impl crate::schema::Schema {
        schema_fn(|v: Value| {
            if v.is_string() {
                Ok(v)
            } else {
                Err(vec![Issue::root("Expected a string", "invalid_type")])
            }
        })
    }

    #[test]
    fn test_builder_requires_route() {
        assert_eq!(
            oc().input(StructuredInputSchema::new()).unwrap_err(),
            ContractBuildError::MissingRoute
        );
        let err = oc()
            .handler(|_: HandlerOptions<Value>| async { Ok::<_, RpcError>(ContractResponse::ok(json!(null))) })
            .unwrap_err();
        assert_eq!(err, ContractBuildError::MissingRoute);
    }

    #[test]
    fn test_builder_rejects_invalid_declarations() {
        let get = oc().route(RouteConfig::get("/planets")).unwrap();
        assert_eq!(
            get.input(StructuredInputSchema::new().body(any())).unwrap_err(),
            ContractBuildError::BodyNotAllowed(HttpMethod::Get)
        );
        assert_eq!(
            get.input(StructuredInputSchema::new().params(any())).unwrap_err(),
            ContractBuildError::ParamsNotAllowed("/planets".to_string())
        );
        assert_eq!(get.output(99, any()).unwrap_err(), ContractBuildError::InvalidStatus(99));
        assert_eq!(get.output(600, any()).unwrap_err(), ContractBuildError::InvalidStatus(600));
        assert!(get.output(599, any()).is_ok());
    }

    #[test]
    fn test_route_summary_fills_meta() {
        let contract = oc()
            .route(RouteConfig::get("/planets").summary("List planets"))
            .unwrap()
            .handler(|_: HandlerOptions<Value>| async { Ok::<_, RpcError>(ContractResponse::ok(json!([]))) })
            .unwrap();
        assert_eq!(contract.to_procedure().meta().summary.as_deref(), Some("List planets"));
        assert!(contract.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_lowered_procedure_validates_declared_status() {
        let contract = oc()
            .route(RouteConfig::get("/planets/{id}"))
            .unwrap()
            .output(200, string_data())
            .unwrap()
            .handler(|opts: HandlerOptions<Value>| async move {
                let id = opts.input["params"]["id"].as_str().unwrap_or_default().to_string();
                match id.as_str() {
                    "earth" => Ok::<_, RpcError>(ContractResponse::ok(json!("Earth"))),
                    "number" => Ok(ContractResponse::ok(json!(3))),
                    _ => Ok(ContractResponse::new(404, json!({ "id": id }))),
                }
            })
            .unwrap();
        let procedure = contract.to_procedure();

        let ok = execute(&procedure, CallOptions::new(json!({ "params": { "id": "earth" } })))
            .await
            .unwrap();
        assert_eq!(ok, json!({ "status": 200, "data": "Earth" }));

        let err = execute(&procedure, CallOptions::new(json!({ "params": { "id": "number" } })))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);

        let err = execute(&procedure, CallOptions::new(json!({ "params": { "id": "pluto" } })))
            .await
            .unwrap_err();
        assert_eq!(err.code().as_str(), "INTERNAL_SERVER_ERROR");
    }
}
