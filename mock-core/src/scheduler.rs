//! Deferred task scheduling
//!
//! Synthetic XHR completions must run strictly after `send` has returned to
//! its caller, so that listeners attached right after `send` still observe
//! the events.

use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;

/// A unit of deferred work
pub type DeferredTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks at some point after the call that scheduled them returns.
pub trait Scheduler: Send + Sync {
    fn defer(&self, task: DeferredTask);
}

/// FIFO queue drained explicitly by the embedder's event loop.
///
/// Tasks never run inside `defer`, which makes ordering fully deterministic.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<DeferredTask>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run every queued task, including ones queued while draining.
    /// Returns how many tasks ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the lock before running so tasks may defer more work.
            let next = self.lock().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<DeferredTask>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Scheduler for TaskQueue {
    fn defer(&self, task: DeferredTask) {
        self.lock().push_back(task);
    }
}

/// Spawns deferred work on a current-thread tokio runtime.
///
/// Each task yields once before running, which places it strictly after the
/// scheduling task's next suspension point. A multi-thread runtime could run
/// it on another worker while `send` is still returning, so it is rejected.
/// `defer` must be called from the thread driving the runtime.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> crate::Result<Self> {
        match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => Ok(Self { handle }),
            flavor => Err(crate::MockError::Configuration(format!(
                "Deferred tasks need a current-thread runtime, got {:?}",
                flavor
            ))),
        }
    }

    /// Capture the runtime the caller is running on.
    pub fn current() -> crate::Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| crate::MockError::Configuration(format!("No tokio runtime: {}", e)))?;
        Self::new(handle)
    }
}

impl Scheduler for TokioScheduler {
    fn defer(&self, task: DeferredTask) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            debug!("Running deferred task");
            task();
        });
    }
}
