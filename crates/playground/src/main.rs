//! Planet demo server
//!
//! Serves the JSON/RPC profile under `RPC_PREFIX` and the REST contracts
//! under `API_PREFIX`. Authenticated procedures expect
//! `Authorization: Bearer token`.

mod config;
mod rpc;
mod server;

use anyhow::Context as _;
use config::ServerConfig;
use orpc::server::rpc_service;
use rpc::context::DB_KEY;
use rpc::{Context, Db, Handlers, JsonHandler, create_contracts, create_router};
use server::BearerContext;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,orpc=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = ServerConfig::from_env()?;

    let handlers = Handlers::new()
        .with(JsonHandler::with_config(create_router(), config.rpc_handler_config())?)
        .with(create_contracts(config.api_handler_config())?);
    let context = Context::new().with(DB_KEY, Db::new());
    let app = rpc_service(BearerContext::new(handlers), context, config.max_body_size);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(
        address = %address,
        rpc = %config.rpc_prefix,
        api = %config.api_prefix,
        "Playground listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("Playground stopped");
    Ok(())
}
