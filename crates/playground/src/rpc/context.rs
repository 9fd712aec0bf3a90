//! Application context and services

use super::{FindPlanet, ListPlanets, NewPlanet, Planet, UpdatePlanet, User};
use orpc::{Context, RpcError, RpcResult};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Context key of the [`Db`]
pub const DB_KEY: &str = "db";
/// Context key of the bearer token, set from the `Authorization` header
pub const TOKEN_KEY: &str = "token";
/// Context key of the signed-in [`User`], set by the auth middleware
pub const USER_KEY: &str = "user";

/// The only token the demo accepts
pub const DEMO_TOKEN: &str = "token";

/// The user every valid token belongs to
pub fn demo_user() -> User {
    User {
        id: "28aa6286-48e9-4f23-adea-3486c86acd55".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
    }
}

/// The [`Db`] stored in `ctx`.
///
/// # Errors
///
/// `INTERNAL_SERVER_ERROR` when the server was started without one.
pub fn db(ctx: &Context) -> RpcResult<&Db> {
    ctx.get::<Db>(DB_KEY)
        .ok_or_else(|| RpcError::internal_server_error("Database missing from context"))
}

/// The signed-in user in `ctx`.
///
/// # Errors
///
/// `UNAUTHORIZED` when no auth middleware ran before.
pub fn current_user(ctx: &Context) -> RpcResult<&User> {
    ctx.get::<User>(USER_KEY)
        .ok_or_else(|| RpcError::unauthorized("Sign in first"))
}

/// In-memory planet store.
///
/// Uses `RwLock` so reads run concurrently and writes are exclusive.
#[derive(Debug, Clone)]
pub struct Db {
    planets: Arc<RwLock<Vec<Planet>>>,
    next_id: Arc<RwLock<u32>>,
}

impl Db {
    pub fn new() -> Self {
        let creator = demo_user().id;
        let planets = [
            ("Mercury", "Closest to the sun"),
            ("Venus", "Hottest planet"),
            ("Earth", "Home"),
            ("Mars", "The red planet"),
        ]
        .into_iter()
        .zip(1..)
        .map(|((name, description), id)| Planet {
            id,
            name: name.to_string(),
            description: Some(description.to_string()),
            creator_id: creator.clone(),
        })
        .collect::<Vec<_>>();

        Self {
            next_id: Arc::new(RwLock::new(planets.len() as u32 + 1)),
            planets: Arc::new(RwLock::new(planets)),
        }
    }

    /// A page of planets ordered by id
    pub async fn list(&self, input: &ListPlanets) -> Vec<Planet> {
        let planets = self.planets.read().await;
        planets
            .iter()
            .skip(input.cursor as usize)
            .take(input.limit as usize)
            .cloned()
            .collect()
    }

    pub async fn find(&self, input: &FindPlanet) -> Option<Planet> {
        let planets = self.planets.read().await;
        planets.iter().find(|p| p.id == input.id).cloned()
    }

    /// Insert a planet owned by `creator`.
    ///
    /// # Errors
    ///
    /// `CONFLICT` when a planet with the same name exists.
    pub async fn create(&self, input: NewPlanet, creator: &User) -> RpcResult<Planet> {
        let mut planets = self.planets.write().await;
        if planets.iter().any(|p| p.name.eq_ignore_ascii_case(&input.name)) {
            return Err(RpcError::conflict(format!("Planet '{}' already exists", input.name)));
        }

        let mut next_id = self.next_id.write().await;
        let planet = Planet {
            id: *next_id,
            name: input.name,
            description: input.description,
            creator_id: creator.id.clone(),
        };
        *next_id += 1;
        planets.push(planet.clone());
        Ok(planet)
    }

    /// Apply `input` to an existing planet; `None` if there is no such planet.
    pub async fn update(&self, input: UpdatePlanet) -> Option<Planet> {
        let mut planets = self.planets.write().await;
        let planet = planets.iter_mut().find(|p| p.id == input.id)?;
        if let Some(name) = input.name {
            planet.name = name;
        }
        if input.description.is_some() {
            planet.description = input.description;
        }
        Some(planet.clone())
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}
