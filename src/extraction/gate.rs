// Completion gate - one-shot latch between "paks are ready" and whoever waits on it
//
// State machine: pending --complete()--> draining --> done (never reverts)
// - Callbacks registered before done are queued and later posted in FIFO order
// - Callbacks registered once done are posted immediately and never queued
// - Each callback is posted exactly once, individually, on the gate's runner
// - Waiters are released only after every queued callback has been posted

use super::{ExtractionError, ExtractionReport};
use crate::metrics::Metrics;
use crate::tasks::TaskRunner;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Cloneable description of a failed extraction, handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Resource extraction failed: {message}")]
pub struct ExtractionFailure {
    pub message: String,
}

impl From<&ExtractionError> for ExtractionFailure {
    fn from(error: &ExtractionError) -> Self {
        Self {
            message: error.to_string(),
        }
    }
}

/// Final result carried by the gate once it is done.
pub type ExtractionOutcome = Result<ExtractionReport, ExtractionFailure>;

/// Callback run once extraction has finished.
pub type CompletionCallback = Box<dyn FnOnce(&ExtractionOutcome) + Send + 'static>;

struct GateState {
    outcome: Option<ExtractionOutcome>,
    pending: VecDeque<CompletionCallback>,

    /// Set once the queue has been fully handed to the runner
    settled: bool,
}

/// One-shot completion latch with a callback queue.
pub struct CompletionGate {
    state: Mutex<GateState>,
    done_cv: Condvar,

    /// Designated execution context for callbacks
    runner: Arc<dyn TaskRunner>,

    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for CompletionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CompletionGate")
            .field("done", &state.settled)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl CompletionGate {
    pub fn new(runner: Arc<dyn TaskRunner>, metrics: Arc<Metrics>) -> Self {
        Self {
            state: Mutex::new(GateState {
                outcome: None,
                pending: VecDeque::new(),
                settled: false,
            }),
            done_cv: Condvar::new(),
            runner,
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // Callbacks never run under the lock, so poisoning can only come from
        // a panic in this module's own bookkeeping; the state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `callback` once extraction is done.
    ///
    /// If the gate is already done the callback is posted right away;
    /// otherwise it is queued behind earlier registrations.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: FnOnce(&ExtractionOutcome) + Send + 'static,
    {
        let mut state = self.lock();
        match &state.outcome {
            Some(outcome) if state.settled => {
                let outcome = outcome.clone();
                drop(state);
                self.dispatch(Box::new(callback), outcome);
            }
            // Still draining: the completing thread picks this up after earlier entries
            _ => {
                state.pending.push_back(Box::new(callback));
                tracing::trace!("Queued completion callback ({} pending)", state.pending.len());
            }
        }
    }

    /// Flip the gate to done and drain queued callbacks in registration order.
    ///
    /// # Returns
    /// `false` if the gate was already done (the new outcome is discarded)
    pub fn complete(&self, outcome: ExtractionOutcome) -> bool {
        let mut state = self.lock();
        if state.outcome.is_some() {
            tracing::warn!("Completion gate already done - ignoring second completion");
            return false;
        }

        state.outcome = Some(outcome.clone());
        let mut dispatched = 0usize;
        loop {
            let batch: Vec<CompletionCallback> = state.pending.drain(..).collect();
            if batch.is_empty() {
                state.settled = true;
                break;
            }
            // Posting may block or run inline, so never under the lock
            drop(state);
            dispatched += batch.len();
            for callback in batch {
                self.dispatch(callback, outcome.clone());
            }
            state = self.lock();
        }
        drop(state);
        self.done_cv.notify_all();

        tracing::debug!(
            "Completion gate done (success={}), dispatched {} queued callback(s)",
            outcome.is_ok(),
            dispatched
        );
        true
    }

    fn dispatch(&self, callback: CompletionCallback, outcome: ExtractionOutcome) {
        self.metrics.record_callback_dispatched();
        self.runner.post(Box::new(move || callback(&outcome)));
    }

    pub fn is_done(&self) -> bool {
        self.lock().settled
    }

    /// The outcome, if the gate is done.
    pub fn outcome(&self) -> Option<ExtractionOutcome> {
        let state = self.lock();
        state.settled.then(|| state.outcome.clone()).flatten()
    }

    /// Number of callbacks waiting for completion.
    pub fn pending_callbacks(&self) -> usize {
        self.lock().pending.len()
    }

    /// Block the calling thread until the gate is done.
    ///
    /// Last resort for callers that cannot be asynchronous: this parks a
    /// thread for as long as extraction takes. Prefer
    /// [`register_callback`](Self::register_callback). Must not be called
    /// from a callback that an inline runner executes inside `complete()`.
    pub fn await_completion(&self) -> ExtractionOutcome {
        let state = self.lock();
        let state = self
            .done_cv
            .wait_while(state, |s| !s.settled)
            .unwrap_or_else(PoisonError::into_inner);
        match &state.outcome {
            Some(outcome) => outcome.clone(),
            None => Err(ExtractionFailure::from(&ExtractionError::Abandoned)),
        }
    }

    /// Like [`await_completion`](Self::await_completion) but gives up after `timeout`.
    pub fn await_completion_timeout(&self, timeout: Duration) -> Option<ExtractionOutcome> {
        let state = self.lock();
        let (state, _) = self
            .done_cv
            .wait_timeout_while(state, timeout, |s| !s.settled)
            .unwrap_or_else(PoisonError::into_inner);
        state.settled.then(|| state.outcome.clone()).flatten()
    }

    /// Receiver resolved with the outcome, for async callers.
    pub fn completion_receiver(&self) -> oneshot::Receiver<ExtractionOutcome> {
        let (tx, rx) = oneshot::channel();
        self.register_callback(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        rx
    }
}
