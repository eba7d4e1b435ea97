//! The dispatcher: a fixed set of workers behind one shared queue.
//!
//! # Design
//! `Pool` is the only entry point for producers. `push` resolves callbacks
//! against the current defaults, wraps the request in an immutable `Task`
//! and enqueues it without waiting. `shutdown` closes the queue in one step
//! (drain, reject further pushes, append one sentinel per worker), so every
//! worker consumes exactly one sentinel even if producers are still
//! pushing. Workers are never cancelled mid-task; `join` waits for the
//! task each one is running to finish.
//!
//! All methods take `&self`, so a pool can be shared across producer
//! threads behind an `Arc`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::{Credentials, ShopClient};
use crate::config::PoolConfig;
use crate::error::{Error, RequestError, Result};
use crate::executor::{HttpExecutor, RequestExecutor};
use crate::queue::TaskQueue;
use crate::task::{Callbacks, ErrorCallback, SuccessCallback, Task, TaskId};
use crate::types::{Request, Response};
use crate::worker::{Worker, WorkerState};

pub struct Pool {
    queue: Arc<TaskQueue>,
    workers: Vec<Worker>,
    defaults: RwLock<Callbacks>,
}

impl Pool {
    /// Start a pool talking HTTP to the configured endpoint.
    pub fn new(config: PoolConfig) -> Result<Self> {
        let client = ShopClient::new(&config.endpoint, Credentials::new(&config.user, &config.key))?
            .raise_on_failure(config.raise_on_failure);
        let executor = HttpExecutor::from_client(client, config.timeout).max_body_bytes(config.max_body_bytes);
        Self::with_executor(executor, config.workers)
    }

    pub fn connect(endpoint: &str, user: &str, key: &str, workers: usize) -> Result<Self> {
        Self::new(PoolConfig::new(endpoint, user, key).workers(workers))
    }

    /// Start `workers` threads that execute tasks through `executor`.
    pub fn with_executor(executor: impl RequestExecutor + 'static, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidWorkerCount(workers));
        }

        let queue = Arc::new(TaskQueue::new());
        let executor: Arc<dyn RequestExecutor> = Arc::new(executor);
        let mut spawned = Vec::with_capacity(workers);
        for index in 0..workers {
            match Worker::spawn(index, Arc::clone(&queue), Arc::clone(&executor)) {
                Ok(worker) => spawned.push(worker),
                Err(err) => {
                    queue.close(spawned.len(), true);
                    return Err(err);
                }
            }
        }
        tracing::info!(workers, "worker pool started");

        Ok(Self {
            queue,
            workers: spawned,
            defaults: RwLock::new(Callbacks::default()),
        })
    }

    /// Replace the success callback used by tasks pushed from now on.
    pub fn set_default_success_callback<F>(&self, callback: F)
    where
        F: Fn(&Task, &Response) + Send + Sync + 'static,
    {
        self.defaults.write().on_success = Some(Arc::new(callback));
    }

    /// Replace the error callback used by tasks pushed from now on.
    pub fn set_default_error_callback<F>(&self, callback: F)
    where
        F: Fn(&RequestError, &Task) + Send + Sync + 'static,
    {
        self.defaults.write().on_error = Some(Arc::new(callback));
    }

    pub fn clear_default_callbacks(&self) {
        *self.defaults.write() = Callbacks::default();
    }

    /// Queue a request using the current default callbacks.
    pub fn push(&self, request: Request) -> Result<TaskId> {
        self.push_with(request, None, None)
    }

    /// Queue a request. Missing callbacks are filled from the defaults as
    /// they are at this moment.
    pub fn push_with(
        &self,
        request: Request,
        on_success: Option<SuccessCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<TaskId> {
        request.validate()?;
        let callbacks = Callbacks {
            on_success,
            on_error,
        }
        .or(&self.defaults.read());

        let task = Task::new(request, callbacks);
        let id = task.id();
        tracing::debug!(task_id = %id, verb = %task.verb(), resource = task.resource(), "task queued");
        self.queue.enqueue(task).map_err(|_| Error::ShutDown)?;
        Ok(id)
    }

    /// Discard pending tasks and stop every worker once its current task is
    /// done. Returns the number of discarded tasks; a second call is a no-op.
    pub fn shutdown(&self) -> usize {
        self.close(true)
    }

    /// Stop accepting tasks but let the queued ones run before the workers
    /// stop.
    pub fn shutdown_graceful(&self) {
        self.close(false);
    }

    fn close(&self, discard_pending: bool) -> usize {
        match self.queue.close(self.workers.len(), discard_pending) {
            Some(drained) => {
                tracing::info!(drained, workers = self.workers.len(), "worker pool shutting down");
                drained
            }
            None => {
                tracing::debug!("worker pool already shut down");
                0
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.queue.is_closed()
    }

    /// Block until every worker thread has exited.
    pub fn join(&self) -> Result<()> {
        if !self.is_shut_down() {
            return Err(Error::NotShutDown);
        }
        let mut first_error = None;
        for worker in &self.workers {
            if let Err(err) = worker.join() {
                tracing::error!(worker = worker.name(), "worker exited abnormally");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(Worker::state).collect()
    }

    /// Tasks waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Tasks executed so far across all workers.
    pub fn processed(&self) -> u64 {
        self.workers.iter().map(Worker::processed).sum()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shutdown_graceful();
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("workers", &self.workers.len())
            .field("pending", &self.pending())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
