//! Procedure tree — the static description of callable capability.
//!
//! A tree is built from three kinds of [`Node`]:
//! ```text
//!   Router ──key──▶ Node            (selected by one path segment)
//!   Transform ──ctx'──▶ Node        (derives a new context, consumes no segment)
//!   Endpoint                        (leaf: validator? + handler)
//! ```
//! Construction only checks structure (legal, unique keys). All behavior
//! happens at dispatch time, see [`crate::dispatch`].

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use crate::envelope::PATH_SEPARATOR;
use crate::types::{BoxError, Error, Result};
use crate::validation::Validator;

mod endpoint;
mod transform;

pub use endpoint::Endpoint;
pub use transform::{ContextTransformer, Transform};

/// Names that must never resolve, to keep metadata-like lookups out of the
/// tree.
pub const RESERVED_NAMES: &[&str] = &["constructor", "prototype", "__proto__"];

/// Check a router key or client path segment.
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name("empty path segment"));
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(Error::invalid_name(format!(
            "{name:?} contains the path separator"
        )));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(Error::invalid_name(format!("{name:?} is reserved")));
    }
    Ok(())
}

/// A unit of the procedure tree.
pub enum Node<C> {
    Endpoint(Endpoint<C>),
    Router(Router<C>),
    Transform(Box<dyn Transform<C>>),
}

impl<C: Send + Sync + 'static> Node<C> {
    /// Leaf without a validator.
    pub fn endpoint<F, Fut, E>(handler: F) -> Self
    where
        F: Fn(C, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::Endpoint(Endpoint::new(handler))
    }

    /// Leaf whose arguments are checked before the handler runs.
    pub fn validated<V, F, Fut, E>(validator: V, handler: F) -> Self
    where
        V: Validator<C> + 'static,
        F: Fn(C, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::Endpoint(Endpoint::new(handler).with_validator(validator))
    }

    /// Derive a new context (possibly of another type) for `next`.
    pub fn transform<D, F, Fut, E>(transform: F, next: Node<D>) -> Self
    where
        D: Send + Sync + 'static,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<D, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::Transform(Box::new(ContextTransformer::new(transform, next)))
    }
}

impl<C> Node<C> {
    pub fn router(router: Router<C>) -> Self {
        Self::Router(router)
    }
}

impl<C> From<Router<C>> for Node<C> {
    fn from(router: Router<C>) -> Self {
        Self::Router(router)
    }
}

impl<C> From<Endpoint<C>> for Node<C> {
    fn from(endpoint: Endpoint<C>) -> Self {
        Self::Endpoint(endpoint)
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(endpoint) => endpoint.fmt(f),
            Self::Router(router) => router.fmt(f),
            Self::Transform(_) => f.write_str("Transform"),
        }
    }
}

/// Named children, selected by one path segment each.
pub struct Router<C> {
    routes: BTreeMap<String, Node<C>>,
}

impl<C> Router<C> {
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    /// Register a child. Fails on illegal or duplicate keys.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<Node<C>>) -> Result<()> {
        let key = key.into();
        check_name(&key)?;
        if self.routes.contains_key(&key) {
            return Err(Error::DuplicateRoute(key));
        }
        self.routes.insert(key, node.into());
        Ok(())
    }

    /// Builder form of [`Router::insert`].
    pub fn route(mut self, key: impl Into<String>, node: impl Into<Node<C>>) -> Result<Self> {
        self.insert(key, node)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Node<C>> {
        self.routes.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<C> Default for Router<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.routes.iter()).finish()
    }
}
