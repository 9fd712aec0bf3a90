//! Procedures
//!
//! A [`Procedure`] is an immutable bundle of middleware, optional input and
//! output schemas, a handler and descriptive metadata. Procedures are built
//! with [`os()`](crate::builder::os) and shared by `Arc` between router
//! positions.

use crate::handler::BoxedHandler;
use crate::middleware::MiddlewareFn;
use crate::schema::DynSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Descriptive metadata attached to a procedure.
///
/// ```rust,ignore
/// let meta = ProcedureMeta::new()
///     .summary("Find a planet")
///     .tag("planets");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcedureMeta {
    /// Short summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the procedure is deprecated
    #[serde(default)]
    pub deprecated: bool,
    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free-form metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ProcedureMeta {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as deprecated.
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Add a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Attach free-form metadata. Values that fail to serialize are dropped.
    pub fn metadata(mut self, metadata: impl Serialize) -> Self {
        self.metadata = serde_json::to_value(metadata).ok();
        self
    }
}

/// An immutable callable unit.
#[derive(Clone)]
pub struct Procedure {
    pub(crate) middlewares: Vec<MiddlewareFn>,
    pub(crate) input_schema: Option<DynSchema>,
    pub(crate) output_schema: Option<DynSchema>,
    pub(crate) handler: BoxedHandler,
    pub(crate) meta: ProcedureMeta,
}

impl Procedure {
    /// Middleware in execution order
    pub fn middlewares(&self) -> &[MiddlewareFn] {
        &self.middlewares
    }

    /// The input schema, if declared
    pub fn input_schema(&self) -> Option<&DynSchema> {
        self.input_schema.as_ref()
    }

    /// The output schema, if declared
    pub fn output_schema(&self) -> Option<&DynSchema> {
        self.output_schema.as_ref()
    }

    /// Descriptive metadata
    pub fn meta(&self) -> &ProcedureMeta {
        &self.meta
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("middlewares", &self.middlewares.len())
            .field("input_schema", &self.input_schema.is_some())
            .field("output_schema", &self.output_schema.is_some())
            .field("meta", &self.meta)
            .finish()
    }
}
