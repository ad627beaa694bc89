//! Batching requester — the client side of the envelope.
//!
//! Calls are queued and coalesced into one round trip when either
//! `max_batch_size` calls are waiting or `max_batch_wait` has passed since the
//! first call of the open window. Taking the queue and resetting it happens
//! under one lock with no suspension point, so each queued call is flushed
//! exactly once.
//!
//! ```text
//!  call ──▶ queue ──(size | timer | flush())──▶ snapshot ──▶ round trip
//!                                                   │
//!   future ◀── settle by position ◀── check id/version ◀┘
//! ```

use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::transport::Transport;
use super::Requester;
use crate::envelope::{Request, JSONRPC_VERSION};
use crate::types::{ClientConfig, Error, Id, Result, RpcError};

/// A queued call waiting for its response.
#[derive(Debug)]
struct PendingCall {
    request: Request,
    reply: oneshot::Sender<Result<Value>>,
}

impl PendingCall {
    fn settle(self, outcome: Result<Value>) {
        // The caller may have stopped waiting; nothing to do then.
        let _ = self.reply.send(outcome);
    }
}

#[derive(Debug, Default)]
struct Queue {
    pending: Vec<PendingCall>,
    /// Bumped on every snapshot so a stale timer cannot flush a newer window.
    window: u64,
    timer_armed: bool,
}

impl Queue {
    fn take(&mut self) -> Vec<PendingCall> {
        self.window += 1;
        self.timer_armed = false;
        std::mem::take(&mut self.pending)
    }
}

#[derive(Debug)]
struct Shared<T> {
    transport: T,
    config: ClientConfig,
    next_id: AtomicU64,
    queue: Mutex<Queue>,
}

/// Client transport that batches calls over a [`Transport`].
///
/// Flushes run as tasks on the caller's tokio runtime, so dropping a call's
/// future never cancels its siblings. A call made outside a runtime settles
/// at once with [`Error::Transport`].
#[derive(Debug)]
pub struct BatchingRequester<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BatchingRequester<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> BatchingRequester<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                next_id: AtomicU64::new(1),
                queue: Mutex::new(Queue::default()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// Queue a call and return a future for its outcome.
    ///
    /// The request is built and queued before this returns; the future only
    /// waits for settlement.
    pub fn call(
        &self,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, settled) = oneshot::channel();
        let call = PendingCall {
            request: Request::new(id, method, args),
            reply,
        };
        match Handle::try_current() {
            Ok(runtime) => Shared::enqueue(&self.shared, &runtime, call),
            Err(e) => {
                call.settle(Err(Error::transport(format!("no tokio runtime: {e}"))));
            }
        }
        async move { settled.await.unwrap_or(Err(Error::Closed)) }
    }

    /// Send whatever is queued right now. A no-op on an empty queue.
    pub async fn flush(&self) {
        let batch = self.shared.lock_queue().take();
        self.shared.round_trip(batch).await;
    }

    /// Number of calls waiting for the next flush.
    pub fn queued(&self) -> usize {
        self.shared.lock_queue().pending.len()
    }
}

impl<T: Transport> Shared<T> {
    fn lock_queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(this: &Arc<Self>, runtime: &Handle, call: PendingCall) {
        let mut queue = this.lock_queue();
        queue.pending.push(call);

        if queue.pending.len() >= this.config.max_batch_size {
            let batch = queue.take();
            drop(queue);
            let shared = Arc::clone(this);
            runtime.spawn(async move { shared.round_trip(batch).await });
        } else if !queue.timer_armed {
            queue.timer_armed = true;
            let window = queue.window;
            drop(queue);
            let shared = Arc::clone(this);
            runtime.spawn(async move {
                tokio::time::sleep(shared.config.max_batch_wait).await;
                let batch = shared.take_window(window);
                shared.round_trip(batch).await;
            });
        }
    }

    /// Snapshot the queue only if it still belongs to `window`.
    fn take_window(&self, window: u64) -> Vec<PendingCall> {
        let mut queue = self.lock_queue();
        if queue.window == window {
            queue.take()
        } else {
            Vec::new()
        }
    }

    async fn round_trip(&self, mut batch: Vec<PendingCall>) {
        if batch.is_empty() {
            return;
        }
        let sent = batch.len();
        tracing::debug!("Flushing {} queued calls", sent);

        let payload = if sent == 1 {
            serde_json::to_value(&batch[0].request)
        } else {
            serde_json::to_value(batch.iter().map(|c| &c.request).collect::<Vec<_>>())
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => return fail_all(batch, &Error::requester(format!("Unencodable request: {e}"))),
        };

        let timeout = self.config.timeout;
        let reply = match tokio::time::timeout(timeout, self.transport.round_trip(payload)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!("Round trip of {} calls failed: {}", sent, e);
                return fail_all(batch, &e);
            }
            Err(_elapsed) => {
                tracing::warn!("Round trip of {} calls timed out after {:?}", sent, timeout);
                return fail_all(batch, &Error::Timeout(timeout));
            }
        };

        if sent == 1 {
            if let Some(call) = batch.pop() {
                let outcome = check_response(&call.request, reply);
                call.settle(outcome);
            }
            return;
        }

        let Value::Array(responses) = reply else {
            return fail_all(batch, &Error::requester("Invalid response: expected an array"));
        };
        if responses.len() != sent {
            tracing::warn!("Batch reply has {} responses for {} requests", responses.len(), sent);
            return fail_all(
                batch,
                &Error::BatchMismatch {
                    sent,
                    received: responses.len(),
                },
            );
        }
        for (call, response) in batch.into_iter().zip(responses) {
            let outcome = check_response(&call.request, response);
            call.settle(outcome);
        }
    }
}

impl<T: Transport> Requester for BatchingRequester<T> {
    fn request(&self, path: &[&str], args: Vec<Value>) -> BoxFuture<'static, Result<Value>> {
        Box::pin(self.call(path.join("."), args))
    }
}

/// Match one response against the request it answers.
fn check_response(request: &Request, response: Value) -> Result<Value> {
    let Value::Object(mut obj) = response else {
        return Err(Error::requester("Invalid response"));
    };
    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(Error::requester("Invalid JSON-RPC version"));
    }
    if obj.get("id").and_then(Id::from_value).as_ref() != Some(&request.id) {
        return Err(Error::requester("Invalid response ID"));
    }
    match obj.remove("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            let error: RpcError = serde_json::from_value(error)
                .map_err(|e| Error::requester(format!("Invalid error object: {e}")))?;
            return Err(Error::Rpc(error));
        }
    }
    obj.remove("result")
        .ok_or_else(|| Error::requester("Response has neither result nor error"))
}

/// Reject every call of a flush with the same failure.
fn fail_all(batch: Vec<PendingCall>, err: &Error) {
    for call in batch {
        call.settle(Err(replicate(err)));
    }
}

fn replicate(err: &Error) -> Error {
    match err {
        Error::Rpc(e) => Error::Rpc(e.clone()),
        Error::Requester(msg) => Error::Requester(msg.clone()),
        Error::BatchMismatch { sent, received } => Error::BatchMismatch {
            sent: *sent,
            received: *received,
        },
        Error::Transport(msg) => Error::Transport(msg.clone()),
        Error::Timeout(after) => Error::Timeout(*after),
        Error::Closed => Error::Closed,
        other => Error::Transport(other.to_string()),
    }
}
