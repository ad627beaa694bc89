//! # kissrpc - procedure-tree RPC
//!
//! Callable capability is described as a tree of routers, context
//! transformers and endpoints, served over a JSON-RPC 2.0 compatible
//! envelope (single or batched), and consumed by a client that coalesces
//! calls into batches:
//! ```text
//!   Client ──▶ BatchingRequester ──▶ Transport ══ wire ══▶ RpcServer
//!                                                            │
//!                                   envelope::import ◀───────┘
//!                                          │
//!                                   dispatch(tree, path, ctx, args)
//!                                          │
//!                                   envelope::export ──▶ Reply { status, body }
//! ```
//!
//! The server is transport-agnostic: an HTTP (or other) adapter feeds it
//! bodies and a per-call context and writes back [`envelope::Reply`].

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod dispatch;
pub mod envelope;
pub mod server;
pub mod tree;
pub mod types;
pub mod validation;

// Internal utilities
pub mod observability;

pub use client::{BatchingRequester, Client, HttpTransport, Requester, Transport};
pub use dispatch::dispatch;
pub use server::RpcServer;
pub use tree::{Node, Router};
pub use types::{Config, Error, Id, Result, RpcError};
pub use validation::{validator_fn, SchemaValidator, Validator};
