//! Context transformers.
//!
//! A transformer turns the current context `C` into a new context `D` and
//! hands dispatch over to its child, which is typed for `D`. The type change
//! is erased behind [`Transform<C>`] so a `Node<C>` can hold it.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use super::Node;
use crate::dispatch::dispatch;
use crate::types::{BoxError, RpcError};

type TransformFn<C, D> = dyn Fn(C) -> BoxFuture<'static, Result<D, BoxError>> + Send + Sync;

/// One step of a context chain, followed by dispatch of the remaining path.
pub trait Transform<C>: Send + Sync {
    /// Derive the next context and continue dispatch of `path` under it.
    fn descend<'a>(
        &'a self,
        ctx: C,
        path: &'a [&'a str],
        args: Vec<Value>,
    ) -> BoxFuture<'a, Result<Value, RpcError>>;
}

/// A transform function paired with the single child evaluated under its
/// output.
pub struct ContextTransformer<C, D> {
    transform: Box<TransformFn<C, D>>,
    next: Node<D>,
}

impl<C: 'static, D: 'static> ContextTransformer<C, D> {
    pub fn new<F, Fut, E>(transform: F, next: Node<D>) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<D, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let transform = move |ctx: C| -> BoxFuture<'static, Result<D, BoxError>> {
            let fut = transform(ctx);
            Box::pin(async move { fut.await.map_err(|e: E| e.into()) })
        };
        Self {
            transform: Box::new(transform),
            next,
        }
    }

    pub fn next(&self) -> &Node<D> {
        &self.next
    }
}

impl<C, D> fmt::Debug for ContextTransformer<C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextTransformer")
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

impl<C, D> Transform<C> for ContextTransformer<C, D>
where
    C: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    fn descend<'a>(
        &'a self,
        ctx: C,
        path: &'a [&'a str],
        args: Vec<Value>,
    ) -> BoxFuture<'a, Result<Value, RpcError>> {
        Box::pin(async move {
            let transformed = AssertUnwindSafe(async move { (self.transform)(ctx).await })
                .catch_unwind()
                .await;
            let next_ctx = match transformed {
                Ok(Ok(next_ctx)) => next_ctx,
                Ok(Err(e)) => {
                    let err = RpcError::classify(e);
                    tracing::warn!("Context transform failed: {}", err);
                    return Err(err);
                }
                Err(payload) => {
                    let err = RpcError::from_panic(payload);
                    tracing::warn!("Context transform panicked: {:?}", err.original_cause());
                    return Err(err);
                }
            };
            dispatch(&self.next, path, next_ctx, args).await
        })
    }
}
