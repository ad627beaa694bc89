//! RPC server — drives the envelope codec and the dispatcher.
//!
//! Transport adapters (HTTP frameworks and the like) decode a body, build a
//! per-call context, and hand both to [`RpcServer::handle_text`] or
//! [`RpcServer::handle_value`]. The returned [`Reply`] carries the status to
//! send and the JSON body.

use futures::future::join_all;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use crate::dispatch::dispatch;
use crate::envelope::{
    self, Candidate, ErrorCode, ParsedRequest, Reply, Request, Response, ResponsePayload,
    SERVER_INFO_METHOD,
};
use crate::tree::Node;
use crate::types::{BatchMode, RpcError, ServerConfig};

type ErrorHandler = dyn Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> Option<RpcError> + Send + Sync;

/// Procedure tree plus the envelope policy around it.
pub struct RpcServer<C> {
    root: Node<C>,
    config: ServerConfig,
    error_handler: Option<Arc<ErrorHandler>>,
}

impl<C> RpcServer<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new(root: Node<C>) -> Self {
        Self::with_config(root, ServerConfig::default())
    }

    pub fn with_config(root: Node<C>, config: ServerConfig) -> Self {
        Self {
            root,
            config,
            error_handler: None,
        }
    }

    /// Map unclassified failures to classified errors. Returning `None`
    /// falls back to InternalError.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&(dyn std::error::Error + Send + Sync + 'static)) -> Option<RpcError>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn root(&self) -> &Node<C> {
        &self.root
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Decode raw text, dispatch, and build the reply.
    pub async fn handle_text(&self, ctx: C, raw: &str) -> Reply {
        Reply::new(self.handle(ctx, envelope::parse_str(raw)).await)
    }

    /// Dispatch an already-decoded payload and build the reply.
    pub async fn handle_value(&self, ctx: C, payload: Value) -> Reply {
        Reply::new(self.handle(ctx, envelope::parse_value(payload)).await)
    }

    /// Answer a parsed payload. Rejected candidates are echoed untouched;
    /// batch responses keep the input order.
    pub async fn handle(&self, ctx: C, parsed: ParsedRequest) -> ResponsePayload {
        match parsed {
            ParsedRequest::Single(candidate) => {
                ResponsePayload::Single(self.answer(ctx, candidate).await)
            }
            ParsedRequest::Batch(candidates) => {
                tracing::debug!("Handling batch of {} requests", candidates.len());
                let responses = match self.config.batch_mode {
                    BatchMode::Concurrent => {
                        join_all(candidates.into_iter().map(|c| self.answer(ctx.clone(), c))).await
                    }
                    BatchMode::Sequential => {
                        let mut responses = Vec::with_capacity(candidates.len());
                        for candidate in candidates {
                            responses.push(self.answer(ctx.clone(), candidate).await);
                        }
                        responses
                    }
                };
                ResponsePayload::Batch(responses)
            }
        }
    }

    async fn answer(&self, ctx: C, candidate: Candidate) -> Response {
        match candidate {
            Candidate::Rejected(response) => {
                if let Some(err) = response.error() {
                    tracing::warn!("Rejected request before dispatch: {}", err);
                }
                response
            }
            Candidate::Valid(request) => self.call(ctx, request).await,
        }
    }

    /// Dispatch one well-formed request.
    pub async fn call(&self, ctx: C, request: Request) -> Response {
        if self.config.expose_server_info && request.method == SERVER_INFO_METHOD {
            return Response::success(request.id, self.server_info());
        }

        let path = request.path();
        let args = request.positional_params();
        match dispatch(&self.root, &path, ctx, args).await {
            Ok(value) => {
                tracing::debug!("RPC OK method={} id={}", request.method, request.id);
                Response::success(request.id.clone(), value)
            }
            Err(err) => {
                let err = self.remap(err);
                log_failure(&request, &err);
                Response::failure(request.id.clone(), err)
            }
        }
    }

    fn server_info(&self) -> Value {
        json!({
            "name": self.config.name,
            "supportedExtensions": [],
        })
    }

    fn remap(&self, err: RpcError) -> RpcError {
        let (Some(handler), Some(cause)) = (&self.error_handler, err.shared_cause()) else {
            return err;
        };
        if err.kind() != ErrorCode::InternalError {
            return err;
        }
        match handler(cause.as_ref()) {
            Some(mapped) => mapped.with_cause(cause),
            None => err,
        }
    }
}

fn log_failure(request: &Request, err: &RpcError) {
    match (err.kind(), err.original_cause()) {
        (ErrorCode::InternalError, Some(cause)) => tracing::error!(
            "RPC Error method={} id={}: {} (cause: {})",
            request.method,
            request.id,
            err,
            cause
        ),
        _ => tracing::warn!("RPC Error method={} id={}: {}", request.method, request.id, err),
    }
}

impl<C> fmt::Debug for RpcServer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcServer")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}
