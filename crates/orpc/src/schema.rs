//! Schema capability
//!
//! A [`Schema`] validates a JSON value and either returns the (possibly
//! normalized) value or a list of [`Issue`]s. The engine only ever talks to
//! this trait; it does not care which schema language sits behind it.
//!
//! Two implementations ship with the crate:
//!
//! - [`TypedSchema<T>`] deserializes into `T`, runs [`Validate`], and
//!   serializes back, so defaults and renames are applied to the value.
//! - [`FnSchema`] wraps a plain closure, built with [`schema_fn`].
//!
//! ```rust,ignore
//! let input = TypedSchema::<CreatePlanet>::new();
//! let even = schema_fn(|value| match value.as_i64() {
//!     Some(n) if n % 2 == 0 => Ok(value),
//!     _ => Err(vec![Issue::root("expected an even number", "custom")]),
//! });
//! ```

use crate::validation::{Issue, Validate};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Validates a value, returning the validated value or issues.
#[async_trait]
pub trait Schema: Send + Sync {
    /// Validate `value`.
    async fn validate(&self, value: Value) -> Result<Value, Vec<Issue>>;
}

/// Shared, type-erased schema.
pub type DynSchema = Arc<dyn Schema>;

#[async_trait]
impl<S: Schema + ?Sized> Schema for Arc<S> {
    async fn validate(&self, value: Value) -> Result<Value, Vec<Issue>> {
        (**self).validate(value).await
    }
}

/// Schema backed by a Rust type.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedSchema<T> {
    /// Create a schema for `T`
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TypedSchema<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Schema for TypedSchema<T>
where
    T: DeserializeOwned + Serialize + Validate + Send + 'static,
{
    async fn validate(&self, value: Value) -> Result<Value, Vec<Issue>> {
        let parsed: T = serde_json::from_value(value)
            .map_err(|e| vec![Issue::root(e.to_string(), "invalid_type")])?;

        parsed.validate().into_result()?;

        serde_json::to_value(&parsed).map_err(|e| vec![Issue::root(e.to_string(), "invalid_type")])
    }
}

/// Schema backed by a synchronous closure.
pub struct FnSchema<F> {
    f: F,
}

/// Build a schema from a closure.
pub fn schema_fn<F>(f: F) -> FnSchema<F>
where
    F: Fn(Value) -> Result<Value, Vec<Issue>> + Send + Sync,
{
    FnSchema { f }
}

#[async_trait]
impl<F> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<Value, Vec<Issue>> + Send + Sync,
{
    async fn validate(&self, value: Value) -> Result<Value, Vec<Issue>> {
        (self.f)(value)
    }
}

impl<F> fmt::Debug for FnSchema<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSchema").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ValidationResult, ValidationRules};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Planet {
        name: String,
        #[serde(default)]
        moons: u32,
    }

    impl Validate for Planet {
        fn validate(&self) -> ValidationResult {
            ValidationRules::new().required("name", &self.name).build()
        }
    }

    #[tokio::test]
    async fn test_typed_schema_normalizes() {
        let schema = TypedSchema::<Planet>::new();
        let value = schema.validate(json!({ "name": "Mars" })).await.unwrap();
        assert_eq!(value, json!({ "name": "Mars", "moons": 0 }));
    }

    #[tokio::test]
    async fn test_typed_schema_reports_type_and_rule_issues() {
        let schema = TypedSchema::<Planet>::new();

        let issues = schema.validate(json!({ "moons": 1 })).await.unwrap_err();
        assert_eq!(issues[0].code, "invalid_type");

        let issues = schema.validate(json!({ "name": "" })).await.unwrap_err();
        assert_eq!(issues[0].code, "required");
    }

    #[tokio::test]
    async fn test_fn_schema() {
        let schema: DynSchema = Arc::new(schema_fn(|v| {
            if v.is_string() {
                Ok(v)
            } else {
                Err(vec![Issue::root("expected string", "invalid_type")])
            }
        }));
        assert_eq!(schema.validate(json!("x")).await.unwrap(), json!("x"));
        assert!(schema.validate(json!(1)).await.is_err());
    }
}
