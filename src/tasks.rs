// Task posting - the execution contexts work is handed to
//
// Nothing in the crate spawns threads on its own. Extraction, preloads and
// completion callbacks are posted to a `TaskRunner` supplied by the caller:
// - `TokioTaskRunner`: background pools of a tokio runtime
// - `LoopTaskRunner`: a single consumer loop (the "main thread"), drained explicitly
// - `ImmediateTaskRunner`: runs the task inline on the posting thread

use std::sync::Arc;
use tokio::sync::mpsc;

/// Unit of work posted to a [`TaskRunner`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// An execution context that accepts fire-and-forget tasks.
///
/// Implementations must run every posted task exactly once, unless the
/// context itself has shut down.
pub trait TaskRunner: Send + Sync {
    fn post(&self, task: Task);
}

impl<T: TaskRunner + ?Sized> TaskRunner for Arc<T> {
    fn post(&self, task: Task) {
        (**self).post(task)
    }
}

/// Runs every task synchronously on the caller's thread.
///
/// Used where ordering must be deterministic, mainly in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateTaskRunner;

impl TaskRunner for ImmediateTaskRunner {
    fn post(&self, task: Task) {
        task();
    }
}

/// Which tokio pool a [`TokioTaskRunner`] posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokioPool {
    /// `spawn_blocking` - file I/O and decoding
    Blocking,
    /// `spawn` - short non-blocking continuations
    Async,
}

/// Posts tasks onto a tokio runtime through its [`Handle`](tokio::runtime::Handle).
#[derive(Debug, Clone)]
pub struct TokioTaskRunner {
    handle: tokio::runtime::Handle,
    pool: TokioPool,
}

impl TokioTaskRunner {
    pub fn new(handle: tokio::runtime::Handle, pool: TokioPool) -> Self {
        Self { handle, pool }
    }

    /// Runner for blocking work (the extraction context).
    pub fn blocking(handle: tokio::runtime::Handle) -> Self {
        Self::new(handle, TokioPool::Blocking)
    }

    pub fn pool(&self) -> TokioPool {
        self.pool
    }
}

impl TaskRunner for TokioTaskRunner {
    fn post(&self, task: Task) {
        match self.pool {
            TokioPool::Blocking => {
                self.handle.spawn_blocking(task);
            }
            TokioPool::Async => {
                self.handle.spawn(async move { task() });
            }
        }
    }
}

/// Posting half of a single-consumer task loop.
///
/// Cloneable; every clone feeds the same [`TaskLoop`].
#[derive(Debug, Clone)]
pub struct LoopTaskRunner {
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskRunner for LoopTaskRunner {
    fn post(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::warn!("Task loop has stopped - dropping posted task");
        }
    }
}

/// Consuming half of a task loop, owned by the thread that plays the
/// "main thread" role.
pub struct TaskLoop {
    rx: mpsc::UnboundedReceiver<Task>,
}

impl std::fmt::Debug for TaskLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLoop").finish_non_exhaustive()
    }
}

impl TaskLoop {
    /// Create a loop and the runner that feeds it.
    pub fn new() -> (LoopTaskRunner, TaskLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LoopTaskRunner { tx }, TaskLoop { rx })
    }

    /// Run every task that is already queued, in posting order.
    ///
    /// # Returns
    /// The number of tasks run
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Block the current thread running tasks until every runner is dropped.
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn run(mut self) {
        tracing::debug!("Task loop started");
        while let Some(task) = self.rx.blocking_recv() {
            task();
        }
        tracing::debug!("Task loop terminated");
    }

    /// Number of tasks waiting to run.
    pub fn pending_len(&self) -> usize {
        self.rx.len()
    }
}
