//! Router
//!
//! A router is a tree: every leaf is a procedure and every internal node maps
//! names to sub-routers. Only leaves are call targets.
//!
//! ```rust,ignore
//! let router = Router::new()
//!     .nest("planet", Router::new()
//!         .procedure("list", list_planets)
//!         .procedure("find", find_planet))
//!     .procedure("health", health);
//!
//! assert!(router.resolve(&["planet", "find"]).is_some());
//! assert!(router.resolve(&["planet"]).is_none());
//! ```

use crate::procedure::Procedure;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Procedure tree.
#[derive(Clone, Debug)]
pub enum Router {
    /// A callable leaf
    Procedure(Arc<Procedure>),
    /// An internal node
    Node(BTreeMap<String, Router>),
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty internal node
    pub fn new() -> Self {
        Self::Node(BTreeMap::new())
    }

    /// Mount a procedure under `name`.
    ///
    /// Mounting on a leaf replaces it with a node. An existing entry with the
    /// same name is replaced.
    pub fn procedure(self, name: impl Into<String>, procedure: impl Into<Arc<Procedure>>) -> Self {
        self.insert(name.into(), Router::Procedure(procedure.into()))
    }

    /// Mount a sub-router under `name`.
    pub fn nest(self, name: impl Into<String>, router: Router) -> Self {
        self.insert(name.into(), router)
    }

    /// Merge the top-level entries of `other` into this router.
    ///
    /// Entries of `other` win on conflict. A leaf `other` is ignored since it
    /// has no name to be mounted under.
    pub fn merge(self, other: Router) -> Self {
        match other {
            Router::Node(entries) => entries
                .into_iter()
                .fold(self, |router, (name, child)| router.insert(name, child)),
            Router::Procedure(_) => {
                warn!("Ignoring merge of a bare procedure into a router");
                self
            }
        }
    }

    fn insert(self, name: String, child: Router) -> Self {
        let mut entries = match self {
            Router::Node(entries) => entries,
            Router::Procedure(_) => BTreeMap::new(),
        };
        entries.insert(name, child);
        Router::Node(entries)
    }

    /// The sub-tree at `path`, if any.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&Router> {
        path.iter().try_fold(self, |node, key| match node {
            Router::Node(entries) => entries.get(key.as_ref()),
            Router::Procedure(_) => None,
        })
    }

    /// Resolve `path` to a procedure.
    ///
    /// Returns `None` for unknown paths and for internal nodes.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&Arc<Procedure>> {
        match self.get(path) {
            Some(Router::Procedure(procedure)) => Some(procedure),
            Some(Router::Node(_)) => {
                debug!(path = %join(path), "Path resolves to a router node, not a procedure");
                None
            }
            None => {
                debug!(path = %join(path), "Procedure not found");
                None
            }
        }
    }

    /// Whether this node is a procedure
    pub fn is_procedure(&self) -> bool {
        matches!(self, Router::Procedure(_))
    }

    /// Dotted paths of every procedure, sorted.
    pub fn procedures(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect(&mut Vec::new(), &mut paths);
        paths
    }

    fn collect(&self, prefix: &mut Vec<String>, out: &mut Vec<String>) {
        match self {
            Router::Procedure(_) => out.push(prefix.join(".")),
            Router::Node(entries) => {
                for (name, child) in entries {
                    prefix.push(name.clone());
                    child.collect(prefix, out);
                    prefix.pop();
                }
            }
        }
    }

    /// Number of procedures in the tree
    pub fn len(&self) -> usize {
        match self {
            Router::Procedure(_) => 1,
            Router::Node(entries) => entries.values().map(Router::len).sum(),
        }
    }

    /// Whether the tree holds no procedure
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Procedure> for Router {
    fn from(procedure: Procedure) -> Self {
        Router::Procedure(Arc::new(procedure))
    }
}

impl From<Arc<Procedure>> for Router {
    fn from(procedure: Arc<Procedure>) -> Self {
        Router::Procedure(procedure)
    }
}

fn join<S: AsRef<str>>(path: &[S]) -> String {
    path.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(".")
}
