//! Argument validators.
//!
//! A validator sees the context and the positional arguments before the
//! endpoint runs. Rejections surface as InvalidParams.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;

use crate::types::{Error, RpcError};

/// Checks the arguments of one endpoint.
#[async_trait]
pub trait Validator<C>: Send + Sync {
    /// Return an InvalidParams error (ideally with per-argument `data`) on
    /// rejection.
    async fn validate(&self, ctx: &C, args: &[Value]) -> Result<(), RpcError>;
}

/// Adapter for a plain closure; its message becomes the InvalidParams message.
pub struct FnValidator<F>(F);

/// Wrap a synchronous closure as a [`Validator`].
pub fn validator_fn<C, F>(f: F) -> FnValidator<F>
where
    F: Fn(&C, &[Value]) -> Result<(), String> + Send + Sync,
{
    FnValidator(f)
}

#[async_trait]
impl<C, F> Validator<C> for FnValidator<F>
where
    C: Sync,
    F: Fn(&C, &[Value]) -> Result<(), String> + Send + Sync,
{
    async fn validate(&self, ctx: &C, args: &[Value]) -> Result<(), RpcError> {
        (self.0)(ctx, args).map_err(RpcError::invalid_params)
    }
}

impl<F> fmt::Debug for FnValidator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnValidator")
    }
}

/// Positional JSON Schema validator: one schema per argument, exact arity.
pub struct SchemaValidator {
    schemas: Vec<jsonschema::Validator>,
}

impl SchemaValidator {
    /// Compile one schema per expected argument.
    pub fn new<I>(schemas: I) -> crate::types::Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let schemas = schemas
            .into_iter()
            .enumerate()
            .map(|(i, schema)| {
                jsonschema::validator_for(&schema)
                    .map_err(|e| Error::InvalidSchema(format!("argument {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { schemas })
    }

    pub fn arity(&self) -> usize {
        self.schemas.len()
    }

    /// Synchronous check shared by every context type.
    pub fn check(&self, args: &[Value]) -> Result<(), RpcError> {
        if args.len() != self.schemas.len() {
            return Err(RpcError::invalid_params("Invalid number of arguments").with_data(json!({
                "expected": self.schemas.len(),
                "received": args.len(),
            })));
        }
        for (i, (schema, arg)) in self.schemas.iter().zip(args).enumerate() {
            let errors: Vec<Value> = schema
                .iter_errors(arg)
                .map(|e| {
                    json!({
                        "argument": i,
                        "path": e.instance_path.to_string(),
                        "message": e.to_string(),
                    })
                })
                .collect();
            if let Some(first) = errors.first() {
                let message = first["message"].as_str().unwrap_or_default().to_string();
                return Err(RpcError::invalid_params(format!(
                    "Type error at argument {i}: {message}"
                ))
                .with_data(json!({ "errors": errors })));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Sync> Validator<C> for SchemaValidator {
    async fn validate(&self, _ctx: &C, args: &[Value]) -> Result<(), RpcError> {
        self.check(args)
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("arity", &self.arity())
            .finish()
    }
}
