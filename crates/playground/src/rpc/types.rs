//! Application types

use orpc::{Validate, ValidationResult, ValidationRules};
use serde::{Deserialize, Serialize};

// =============================================================================
// User Types
// =============================================================================

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl Validate for User {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new()
            .required("id", &self.id)
            .email("email", &self.email)
            .required("name", &self.name)
            .build()
    }
}

/// Input for signing up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for NewUser {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new()
            .required("name", &self.name)
            .max_length("name", &self.name, 64)
            .email("email", &self.email)
            .min_length("password", &self.password, 8)
            .build()
    }
}

/// Input for signing in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for Credentials {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new()
            .email("email", &self.email)
            .required("password", &self.password)
            .build()
    }
}

/// Session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
}

impl Validate for Token {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new().required("token", &self.token).build()
    }
}

// =============================================================================
// Planet Types
// =============================================================================

/// Planet entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub creator_id: String,
}

impl Validate for Planet {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new()
            .range("id", i64::from(self.id), 1, i64::from(u32::MAX))
            .required("name", &self.name)
            .build()
    }
}

/// Input for creating a planet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlanet {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for NewPlanet {
    fn validate(&self) -> ValidationResult {
        let description = self.description.as_deref().unwrap_or_default();
        ValidationRules::new()
            .required("name", &self.name)
            .max_length("name", &self.name, 64)
            .max_length("description", description, 1024)
            .build()
    }
}

/// Input for updating a planet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePlanet {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for UpdatePlanet {
    fn validate(&self) -> ValidationResult {
        let mut rules = ValidationRules::new().range("id", i64::from(self.id), 1, i64::from(u32::MAX));
        if let Some(name) = &self.name {
            rules = rules.required("name", name).max_length("name", name, 64);
        }
        rules.build()
    }
}

fn default_limit() -> u32 {
    10
}

/// Input for listing planets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPlanets {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub cursor: u32,
}

impl Default for ListPlanets {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            cursor: 0,
        }
    }
}

impl Validate for ListPlanets {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new()
            .range("limit", i64::from(self.limit), 1, 100)
            .build()
    }
}

/// Input for finding a planet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPlanet {
    pub id: u32,
}

impl Validate for FindPlanet {
    fn validate(&self) -> ValidationResult {
        ValidationRules::new()
            .range("id", i64::from(self.id), 1, i64::from(u32::MAX))
            .build()
    }
}
