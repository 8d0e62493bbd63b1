//! The isolated execution unit: one dedicated thread per helper.

use super::error::WorkerError;
use super::registry::{Descriptor, ErasedComputation, Registry};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// Every unit thread is named `{UNIT_THREAD_PREFIX}{id}`.
pub const UNIT_THREAD_PREFIX: &str = "offload-unit-";

/// Message from the owner to the unit.
#[derive(Debug)]
pub(crate) struct Request {
    pub seq: u64,
    pub payload: Value,
}

/// Message from the unit back to the owner.
#[derive(Debug)]
pub(crate) struct Response {
    pub seq: u64,
    pub outcome: Result<Value, WorkerError>,
}

/// Owner-side handle. Dropping it terminates the unit.
pub(crate) struct UnitHandle {
    id: u64,
    request_tx: UnboundedSender<Request>,
    pub(crate) response_rx: UnboundedReceiver<Response>,
    terminated: Arc<AtomicBool>,
    // Detached on drop; in-flight work is never awaited.
    _thread: std::thread::JoinHandle<()>,
}

impl UnitHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the request back if the unit has already gone away.
    pub fn send(&self, request: Request) -> Result<(), Request> {
        self.request_tx.send(request).map_err(|e| e.0)
    }
}

impl Drop for UnitHandle {
    fn drop(&mut self) {
        self.terminated.store(true, Ordering::Release);
        tracing::debug!(unit = self.id, "execution unit terminated");
    }
}

/// Spawn a unit that serves requests for `descriptor`.
pub(crate) fn spawn(descriptor: Descriptor, registry: Registry) -> std::io::Result<UnitHandle> {
    let id = NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed);
    let (request_tx, request_rx) = mpsc::unbounded_channel::<Request>();
    let (response_tx, response_rx) = mpsc::unbounded_channel::<Response>();
    let terminated = Arc::new(AtomicBool::new(false));

    let flag = terminated.clone();
    let thread = std::thread::Builder::new()
        .name(format!("{UNIT_THREAD_PREFIX}{id}"))
        .spawn(move || serve(id, descriptor, registry, request_rx, response_tx, flag))?;

    tracing::debug!(unit = id, "execution unit spawned");
    Ok(UnitHandle {
        id,
        request_tx,
        response_rx,
        terminated,
        _thread: thread,
    })
}

/// Unit whose thread runs `body` instead of the dispatch loop.
#[cfg(test)]
pub(crate) fn spawn_with<F>(body: F) -> UnitHandle
where
    F: FnOnce(UnboundedReceiver<Request>, UnboundedSender<Response>) + Send + 'static,
{
    let id = NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed);
    let (request_tx, request_rx) = mpsc::unbounded_channel::<Request>();
    let (response_tx, response_rx) = mpsc::unbounded_channel::<Response>();
    let thread = std::thread::spawn(move || body(request_rx, response_tx));
    UnitHandle {
        id,
        request_tx,
        response_rx,
        terminated: Arc::new(AtomicBool::new(false)),
        _thread: thread,
    }
}

/// Message-dispatch loop: one request in, one response out.
fn serve(
    id: u64,
    descriptor: Descriptor,
    registry: Registry,
    mut request_rx: UnboundedReceiver<Request>,
    response_tx: UnboundedSender<Response>,
    terminated: Arc<AtomicBool>,
) {
    let computation = registry.resolve(&descriptor);
    if computation.is_none() {
        tracing::warn!(unit = id, computation = %descriptor, "descriptor did not resolve");
    }

    while let Some(request) = request_rx.blocking_recv() {
        if terminated.load(Ordering::Acquire) {
            break;
        }
        let outcome = match computation.as_deref() {
            Some(c) => dispatch(c, request.payload),
            None => Err(WorkerError::UnknownComputation(descriptor.name().to_string())),
        };
        if terminated.load(Ordering::Acquire) {
            break;
        }
        let response = Response {
            seq: request.seq,
            outcome,
        };
        if response_tx.send(response).is_err() {
            break;
        }
    }

    tracing::debug!(unit = id, "execution unit exiting");
}

fn dispatch(computation: &dyn ErasedComputation, payload: Value) -> Result<Value, WorkerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| computation.call(payload))) {
        Ok(outcome) => outcome,
        Err(panic) => Err(WorkerError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
