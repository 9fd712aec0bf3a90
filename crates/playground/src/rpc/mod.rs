//! Application RPC Module
//!
//! Procedures, middleware and REST contracts of the planet demo.

pub mod context;
mod contract;
mod handlers;
mod middleware;
mod types;

pub use context::Db;
pub use contract::create_contracts;
pub use handlers::create_router;
pub use types::*;

pub use orpc::prelude::*;
