//! Leaf procedures.

use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::types::BoxError;
use crate::validation::Validator;

type HandlerFn<C> =
    dyn Fn(C, Vec<Value>) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync;

/// A callable leaf taking the context and positional arguments, with an
/// optional validator that runs first.
pub struct Endpoint<C> {
    handler: Arc<HandlerFn<C>>,
    validator: Option<Arc<dyn Validator<C>>>,
}

impl<C: Send + 'static> Endpoint<C> {
    pub fn new<F, Fut, E>(handler: F) -> Self
    where
        F: Fn(C, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let handler = move |ctx: C, args: Vec<Value>| -> BoxFuture<'static, Result<Value, BoxError>> {
            let fut = handler(ctx, args);
            Box::pin(async move { fut.await.map_err(|e: E| e.into()) })
        };
        Self {
            handler: Arc::new(handler),
            validator: None,
        }
    }
}

impl<C> Endpoint<C> {
    pub fn with_validator(mut self, validator: impl Validator<C> + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn validator(&self) -> Option<&dyn Validator<C>> {
        self.validator.as_deref()
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// Run the handler. Validation is the dispatcher's job.
    pub fn invoke(&self, ctx: C, args: Vec<Value>) -> BoxFuture<'static, Result<Value, BoxError>> {
        (self.handler)(ctx, args)
    }
}

impl<C> fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("validated", &self.has_validator())
            .finish_non_exhaustive()
    }
}
