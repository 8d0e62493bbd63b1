//! Background computation helper.
//!
//! [`Offload`] owns one execution unit and tracks a single invocation at a time. Input and
//! output cross the boundary as JSON values, so nothing is shared with the unit. Responses are
//! applied on the owner's side by [`Offload::poll`] (render loops) or [`Offload::settle`]
//! (async callers).

mod error;
mod registry;
mod unit;

pub use error::{ComputeError, OffloadError, WorkerError};
pub use registry::{Computation, Descriptor, Registry};
pub use unit::UNIT_THREAD_PREFIX;

use tokio::sync::mpsc::error::TryRecvError;
use unit::{Request, Response, UnitHandle};

/// Lifecycle of the current offloaded computation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationState<O> {
    Idle,
    Running { seq: u64 },
    Completed(O),
    Failed(WorkerError),
}

impl<O> InvocationState<O> {
    pub fn is_running(&self) -> bool {
        matches!(self, InvocationState::Running { .. })
    }
}

pub struct Offload<C: Computation> {
    registry: Registry,
    descriptor: Descriptor,
    unit: Option<UnitHandle>,
    closed: bool,
    last_seq: u64,
    state: InvocationState<C::Output>,
}

impl<C: Computation> Offload<C> {
    /// Create a helper for `C`. The execution unit is spawned on first use.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            descriptor: Descriptor::of::<C>(),
            unit: None,
            closed: false,
            last_seq: 0,
            state: InvocationState::Idle,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn state(&self) -> &InvocationState<C::Output> {
        &self.state
    }

    pub fn result(&self) -> Option<&C::Output> {
        match &self.state {
            InvocationState::Completed(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WorkerError> {
        match &self.state {
            InvocationState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.unit.is_some()
    }

    /// Spawn the execution unit if it does not exist yet.
    pub fn open(&mut self) -> Result<(), OffloadError> {
        if self.closed {
            return Err(OffloadError::Closed);
        }
        if self.unit.is_none() {
            if !self.registry.contains(&self.descriptor) {
                tracing::warn!(computation = %self.descriptor, "computation is not registered");
            }
            let unit = unit::spawn(self.descriptor.clone(), self.registry.clone())
                .map_err(OffloadError::Spawn)?;
            tracing::info!(computation = %self.descriptor, unit = unit.id(), "offload opened");
            self.unit = Some(unit);
        }
        Ok(())
    }

    /// Hand `input` to the execution unit and return immediately.
    ///
    /// Only one computation runs at a time: a call while one is in flight is rejected with
    /// [`OffloadError::Busy`] and leaves the current invocation untouched.
    pub fn trigger(&mut self, input: C::Input) -> Result<u64, OffloadError> {
        if self.closed {
            return Err(OffloadError::Closed);
        }
        if self.state.is_running() {
            return Err(OffloadError::Busy);
        }
        let payload = serde_json::to_value(input).map_err(OffloadError::Encode)?;
        self.open()?;

        let seq = self.last_seq + 1;
        let sent = match &self.unit {
            Some(unit) => unit.send(Request { seq, payload }).is_ok(),
            None => false,
        };
        if !sent {
            // The unit is gone; the next trigger spawns a fresh one.
            self.unit = None;
            return Err(OffloadError::Disconnected);
        }

        self.last_seq = seq;
        self.state = InvocationState::Running { seq };
        tracing::debug!(computation = %self.descriptor, seq, "triggered");
        Ok(seq)
    }

    /// Apply every response that is ready, without blocking. Returns true if the invocation
    /// state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            let received = match self.unit.as_mut() {
                Some(unit) => unit.response_rx.try_recv(),
                None => break,
            };
            match received {
                Ok(response) => changed |= self.apply(response),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    changed |= self.unit_exited();
                    break;
                }
            }
        }
        changed
    }

    /// Wait until the current invocation leaves `Running`. Returns immediately otherwise.
    pub async fn settle(&mut self) -> &InvocationState<C::Output> {
        while self.state.is_running() {
            let received = match self.unit.as_mut() {
                Some(unit) => unit.response_rx.recv().await,
                None => None,
            };
            match received {
                Some(response) => {
                    self.apply(response);
                }
                None => {
                    self.unit_exited();
                }
            }
        }
        &self.state
    }

    /// Terminate the execution unit. In-flight work is abandoned and its response is never
    /// delivered; the helper cannot be reopened.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.unit = None;
        if self.state.is_running() {
            self.state = InvocationState::Idle;
        }
        tracing::info!(computation = %self.descriptor, "offload closed");
    }

    fn apply(&mut self, response: Response) -> bool {
        let InvocationState::Running { seq } = self.state else {
            tracing::debug!(seq = response.seq, "discarding response with no running request");
            return false;
        };
        if response.seq != seq {
            tracing::debug!(seq = response.seq, expected = seq, "discarding stale response");
            return false;
        }

        let decoded = response.outcome.and_then(|value| {
            serde_json::from_value::<C::Output>(value)
                .map_err(|e| WorkerError::Decode(e.to_string()))
        });
        self.state = match decoded {
            Ok(output) => {
                tracing::debug!(computation = %self.descriptor, seq, "completed");
                InvocationState::Completed(output)
            }
            Err(err) => {
                tracing::warn!(computation = %self.descriptor, seq, error = %err, "failed");
                InvocationState::Failed(err)
            }
        };
        true
    }

    fn unit_exited(&mut self) -> bool {
        self.unit = None;
        if self.state.is_running() {
            self.state = InvocationState::Failed(WorkerError::UnitExited);
            return true;
        }
        false
    }
}

impl<C: Computation> Drop for Offload<C> {
    fn drop(&mut self) {
        self.close();
    }
}
