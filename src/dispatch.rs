//! Dispatcher — resolves a method path against a procedure tree.
//!
//! Per call:
//! 1. Context transformers run in order, each replacing the context; they
//!    never consume a path segment.
//! 2. Each remaining segment must select a child of a router.
//! 3. With the path exhausted the node must be an endpoint: its validator
//!    runs (rejection is InvalidParams), then the handler.
//!
//! Every failure leaves as a classified [`RpcError`], panics included; there
//! are no retries.

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;

use crate::tree::Node;
use crate::types::RpcError;

/// Resolve `path` under `root` with `ctx`, validate `args`, invoke.
pub async fn dispatch<C>(
    root: &Node<C>,
    path: &[&str],
    ctx: C,
    args: Vec<Value>,
) -> Result<Value, RpcError>
where
    C: Send + Sync + 'static,
{
    let mut node = root;
    let mut rest = path;

    loop {
        match node {
            // The transformer continues dispatch under the context it derives.
            Node::Transform(transformer) => return transformer.descend(ctx, rest, args).await,
            Node::Router(router) => {
                let Some((segment, tail)) = rest.split_first() else {
                    tracing::debug!("Path ended at a router");
                    return Err(RpcError::method_not_found());
                };
                node = match router.get(segment) {
                    Some(child) => child,
                    None => {
                        tracing::debug!("No route for segment {:?}", segment);
                        return Err(RpcError::method_not_found());
                    }
                };
                rest = tail;
            }
            Node::Endpoint(endpoint) => {
                if !rest.is_empty() {
                    tracing::debug!("Path continues past an endpoint: {:?}", rest);
                    return Err(RpcError::method_not_found());
                }
                let call = async move {
                    if let Some(validator) = endpoint.validator() {
                        if let Err(err) = validator.validate(&ctx, &args).await {
                            return Err(err);
                        }
                    }
                    endpoint.invoke(ctx, args).await.map_err(RpcError::classify)
                };
                return match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(RpcError::from_panic(payload)),
                };
            }
        }
    }
}
