//! Per-call context
//!
//! A [`Context`] is an open key/value mapping that flows through the
//! middleware chain into the handler. Values are type-erased and shared, so
//! cloning a context is cheap and never clones the values themselves.
//!
//! Middleware may add or override keys for later stages by passing a partial
//! context to `next`; keys are never removed.
//!
//! ```rust,ignore
//! let ctx = Context::new().with("db", Db::connect()?);
//! let db: Option<&Db> = ctx.get::<Db>("db");
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased context value
pub type SharedValue = Arc<dyn Any + Send + Sync>;

/// Open key/value mapping carried through a call.
#[derive(Clone, Default)]
pub struct Context {
    values: HashMap<String, SharedValue>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or override a value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Insert an already shared value without re-wrapping it.
    pub fn insert_arc(&mut self, key: impl Into<String>, value: SharedValue) {
        self.values.insert(key.into(), value);
    }

    /// Typed lookup. Returns `None` when the key is absent or holds another type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// The shared value stored under `key`.
    pub fn get_arc(&self, key: &str) -> Option<SharedValue> {
        self.values.get(key).cloned()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys currently present, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shallow merge: keys from `partial` override keys in `self`.
    pub fn merge(&self, partial: &Context) -> Context {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }

    /// In-place version of [`Context::merge`].
    pub fn extend(&mut self, partial: &Context) {
        for (key, value) in &partial.values {
            self.values.insert(key.clone(), Arc::clone(value));
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_get() {
        let ctx = Context::new().with("user", "alice".to_string()).with("n", 3u32);
        assert_eq!(ctx.get::<String>("user").map(String::as_str), Some("alice"));
        assert_eq!(ctx.get::<u32>("n"), Some(&3));
        assert_eq!(ctx.get::<u64>("n"), None);
        assert_eq!(ctx.get::<u32>("missing"), None);
    }

    #[test]
    fn test_merge_overrides_and_keeps() {
        let base = Context::new().with("a", 1i32).with("b", 2i32);
        let partial = Context::new().with("b", 20i32).with("c", 30i32);

        let merged = base.merge(&partial);
        assert_eq!(merged.get::<i32>("a"), Some(&1));
        assert_eq!(merged.get::<i32>("b"), Some(&20));
        assert_eq!(merged.get::<i32>("c"), Some(&30));
        assert_eq!(merged.len(), 3);
        // The original is untouched.
        assert_eq!(base.get::<i32>("b"), Some(&2));
    }

    #[test]
    fn test_debug_lists_sorted_keys() {
        let ctx = Context::new().with("z", 1u8).with("a", 2u8);
        assert_eq!(format!("{:?}", ctx), r#"Context { keys: ["a", "z"] }"#);
    }
}
