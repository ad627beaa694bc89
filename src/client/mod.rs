//! Client side: typed invocation over a pluggable requester.
//!
//! [`Client`] turns a method path plus arguments into a call on a
//! [`Requester`]. [`BatchingRequester`] is the stock requester; it coalesces
//! calls into batches and ships them over a [`Transport`].

pub mod requester;
pub mod transport;

pub use requester::BatchingRequester;
pub use transport::{HttpTransport, Transport};

use futures::future::{self, BoxFuture};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::envelope::PATH_SEPARATOR;
use crate::tree::check_name;
use crate::types::{Error, Result};

/// Sends one call and yields its settled outcome.
pub trait Requester: Send + Sync + 'static {
    fn request(&self, path: &[&str], args: Vec<Value>) -> BoxFuture<'static, Result<Value>>;

    /// Whether calls may be chained on unresolved results. No stock
    /// requester does this.
    fn supports_pipelining(&self) -> bool {
        false
    }
}

/// Typed front end over a [`Requester`].
pub struct Client<R> {
    requester: Arc<R>,
}

impl<R> Clone for Client<R> {
    fn clone(&self) -> Self {
        Self {
            requester: Arc::clone(&self.requester),
        }
    }
}

impl<R: Requester> Client<R> {
    pub fn new(requester: R) -> Self {
        Self {
            requester: Arc::new(requester),
        }
    }

    pub fn requester(&self) -> &R {
        &self.requester
    }

    /// Call a dotted method name, e.g. `"math.add"`.
    pub fn call(&self, method: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value>> {
        let path: Vec<&str> = method.split(PATH_SEPARATOR).collect();
        self.call_path(&path, args)
    }

    /// Call a method given as path segments.
    pub fn call_path(&self, path: &[&str], args: Vec<Value>) -> BoxFuture<'static, Result<Value>> {
        if let Err(e) = path.iter().try_for_each(|segment| check_name(segment)) {
            return Box::pin(future::ready(Err(e)));
        }
        self.requester.request(path, args)
    }

    /// Serialize `args`, call, and decode the result as `T`.
    ///
    /// A sequence serializes to the positional arguments as-is, `()` to no
    /// arguments, and anything else to a single argument.
    pub fn invoke<A, T>(&self, method: &str, args: A) -> BoxFuture<'static, Result<T>>
    where
        A: Serialize,
        T: DeserializeOwned + 'static,
    {
        let pending = serde_json::to_value(args)
            .map_err(Error::from)
            .map(|args| self.call(method, positional(args)));
        Box::pin(async move {
            let value = pending?.await?;
            Ok(serde_json::from_value(value)?)
        })
    }

    /// Scope further calls under `segment`.
    pub fn path(&self, segment: &str) -> Result<Scope<R>> {
        check_name(segment)?;
        Ok(Scope {
            client: self.clone(),
            path: vec![segment.to_string()],
        })
    }
}

fn positional(args: Value) -> Vec<Value> {
    match args {
        Value::Array(args) => args,
        Value::Null => Vec::new(),
        arg => vec![arg],
    }
}

impl<R> fmt::Debug for Client<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("requester", &std::any::type_name::<R>())
            .finish()
    }
}

/// A client bound to a path prefix, e.g. `client.path("math")?.call("add", ..)`.
pub struct Scope<R> {
    client: Client<R>,
    path: Vec<String>,
}

impl<R: Requester> Scope<R> {
    /// Descend one more segment.
    pub fn path(&self, segment: &str) -> Result<Scope<R>> {
        check_name(segment)?;
        let mut path = self.path.clone();
        path.push(segment.to_string());
        Ok(Scope {
            client: self.client.clone(),
            path,
        })
    }

    pub fn call(&self, method: &str, args: Vec<Value>) -> BoxFuture<'static, Result<Value>> {
        let mut path: Vec<&str> = self.path.iter().map(String::as_str).collect();
        path.extend(method.split(PATH_SEPARATOR));
        self.client.call_path(&path, args)
    }

    pub fn invoke<A, T>(&self, method: &str, args: A) -> BoxFuture<'static, Result<T>>
    where
        A: Serialize,
        T: DeserializeOwned + 'static,
    {
        let pending = serde_json::to_value(args)
            .map_err(Error::from)
            .map(|args| self.call(method, positional(args)));
        Box::pin(async move {
            let value = pending?.await?;
            Ok(serde_json::from_value(value)?)
        })
    }

    pub fn prefix(&self) -> String {
        self.path.join(".")
    }
}

impl<R> fmt::Debug for Scope<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("path", &self.path).finish()
    }
}
