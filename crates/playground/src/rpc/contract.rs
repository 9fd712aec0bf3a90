//! REST contracts
//!
//! The same planet store served as `GET /planets`, `GET /planets/{id}` and
//! `POST /planets`.

use super::context::{current_user, db};
use super::middleware::require_user;
use super::*;
use orpc::contract::{ContractBuildError, ContractProcedure};
use orpc::schema_fn;
use orpc::server::ContractHandler;
use serde::de::DeserializeOwned;

/// Schema for string-valued parts (path params, query): numeric strings
/// become numbers before `T` is deserialized and validated.
fn coerced<T>() -> impl Schema
where
    T: DeserializeOwned + Serialize + Validate + 'static,
{
    schema_fn(|value: Value| {
        let mut object = value.as_object().cloned().unwrap_or_default();
        for field in object.values_mut() {
            if let Some(number) = field.as_str().and_then(|s| s.parse::<u64>().ok()) {
                *field = json!(number);
            }
        }

        let parsed: T = serde_json::from_value(Value::Object(object))
            .map_err(|e| vec![Issue::root(e.to_string(), "invalid_type")])?;
        parsed.validate().into_result()?;
        serde_json::to_value(parsed).map_err(|e| vec![Issue::root(e.to_string(), "invalid_type")])
    })
}

fn list_contract() -> Result<ContractProcedure, ContractBuildError> {
    oc().route(RouteConfig::get("/planets").summary("List planets"))?
        .input(StructuredInputSchema::new().query(coerced::<ListPlanets>()))?
        .output(200, TypedSchema::<Vec<Planet>>::new())?
        .handler(|opts: HandlerOptions<Value>| async move {
            let query: ListPlanets = serde_json::from_value(opts.input["query"].clone())?;
            let planets = db(&opts.context)?.list(&query).await;
            Ok::<_, RpcError>(ContractResponse::ok(json!(planets)))
        })
}

fn find_contract() -> Result<ContractProcedure, ContractBuildError> {
    oc().route(RouteConfig::get("/planets/{id}").summary("Find a planet"))?
        .input(StructuredInputSchema::new().params(coerced::<FindPlanet>()))?
        .output(200, TypedSchema::<Planet>::new())?
        .output(404, schema_fn(Ok))?
        .handler(|opts: HandlerOptions<Value>| async move {
            let params: FindPlanet = serde_json::from_value(opts.input["params"].clone())?;
            let response = match db(&opts.context)?.find(&params).await {
                Some(planet) => ContractResponse::ok(json!(planet)),
                None => ContractResponse::new(404, json!({ "message": "Planet not found" })),
            };
            Ok::<_, RpcError>(response)
        })
}

fn create_contract() -> Result<ContractProcedure, ContractBuildError> {
    oc().route(RouteConfig::post("/planets").summary("Create a planet"))?
        .use_middleware(require_user)
        .input(StructuredInputSchema::new().body(TypedSchema::<NewPlanet>::new()))?
        .output(201, TypedSchema::<Planet>::new())?
        .handler(|opts: HandlerOptions<Value>| async move {
            let body: NewPlanet = serde_json::from_value(opts.input["body"].clone())?;
            let user = current_user(&opts.context)?;
            let planet = db(&opts.context)?.create(body, user).await?;
            Ok::<_, RpcError>(ContractResponse::new(201, json!(planet)))
        })
}

/// REST handler serving every planet contract under `config.prefix`.
pub fn create_contracts(config: HandlerConfig) -> anyhow::Result<ContractHandler> {
    Ok(ContractHandler::with_config(config)?
        .contract("planet.list", list_contract()?)
        .contract("planet.find", find_contract()?)
        .contract("planet.create", create_contract()?))
}
