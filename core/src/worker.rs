//! Worker threads: dequeue, execute, call back, repeat.
//!
//! # Design
//! A worker has two states. It is `Running` from spawn until it dequeues a
//! `Job::Shutdown`, then `Stopped` for good; nothing else ends the loop.
//! A failed round trip goes to the task's error callback, or to the log
//! when there is none. Execution and callback invocation run under
//! `catch_unwind`, so a panicking executor or callback is logged and the
//! worker moves on to the next job. Callbacks run on the worker thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::queue::{Job, TaskQueue};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct Status {
    stopped: AtomicBool,
    processed: AtomicU64,
}

#[derive(Debug)]
pub(crate) struct Worker {
    name: String,
    status: Arc<Status>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub(crate) fn spawn(
        index: usize,
        queue: Arc<TaskQueue>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Self> {
        let name = format!("shopware-worker-{index}");
        let status = Arc::new(Status::default());
        let handle = {
            let name = name.clone();
            let status = Arc::clone(&status);
            thread::Builder::new()
                .name(name.clone())
                .spawn(move || run(&name, &queue, executor.as_ref(), &status))?
        };
        Ok(Self {
            name,
            status,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> WorkerState {
        if self.status.stopped.load(Ordering::Acquire) {
            WorkerState::Stopped
        } else {
            WorkerState::Running
        }
    }

    pub(crate) fn processed(&self) -> u64 {
        self.status.processed.load(Ordering::Relaxed)
    }

    /// Wait for the thread to exit. Joining twice is a no-op.
    pub(crate) fn join(&self) -> Result<()> {
        let Some(handle) = self.handle.lock().take() else {
            return Ok(());
        };
        handle
            .join()
            .map_err(|_| Error::WorkerPanicked(self.name.clone()))
    }
}

fn run(name: &str, queue: &TaskQueue, executor: &dyn RequestExecutor, status: &Status) {
    tracing::debug!(worker = name, "worker started");
    loop {
        let task = match queue.dequeue() {
            Job::Run(task) => task,
            Job::Shutdown => break,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(executor, &task)));
        status.processed.fetch_add(1, Ordering::Relaxed);
        if let Err(payload) = outcome {
            tracing::error!(
                worker = name,
                task_id = %task.id(),
                panic = panic_message(payload.as_ref()),
                "task panicked, worker continues"
            );
        }
    }
    status.stopped.store(true, Ordering::Release);
    tracing::debug!(worker = name, "worker stopped");
}

/// Execute one task and invoke exactly one of its callbacks.
fn dispatch(executor: &dyn RequestExecutor, task: &Task) {
    tracing::debug!(
        task_id = %task.id(),
        verb = %task.verb(),
        resource = task.resource(),
        "executing task"
    );
    match executor.execute(task.request()) {
        Ok(response) => {
            if let Some(on_success) = task.on_success() {
                on_success(task, &response);
            }
        }
        Err(error) => match task.on_error() {
            Some(on_error) => on_error(&error, task),
            None => tracing::error!(
                task_id = %task.id(),
                verb = %task.verb(),
                resource = task.resource(),
                %error,
                "task failed with no error callback"
            ),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use serde_json::{json, Map};

    use super::*;
    use crate::error::RequestError;
    use crate::task::{Callbacks, ErrorCallback, SuccessCallback};
    use crate::types::{Request, Response};

    fn ok_executor() -> Arc<dyn RequestExecutor> {
        Arc::new(|_: &Request| -> std::result::Result<Response, RequestError> {
            Ok(Response {
                status: 200,
                body: Map::new(),
            })
        })
    }

    #[test]
    fn worker_stops_on_sentinel() {
        let queue = Arc::new(TaskQueue::new());
        let worker = Worker::spawn(0, Arc::clone(&queue), ok_executor()).unwrap();
        assert_eq!(worker.state(), WorkerState::Running);
        assert_eq!(worker.name(), "shopware-worker-0");

        queue.close(1, false);
        worker.join().unwrap();
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert_eq!(worker.processed(), 0);
        worker.join().unwrap();
    }

    #[test]
    fn failure_goes_to_error_callback_and_worker_continues() {
        let executor: Arc<dyn RequestExecutor> =
            Arc::new(|request: &Request| -> std::result::Result<Response, RequestError> {
                if request.resource == "down" {
                    Err(RequestError::Transport("connection refused".to_string()))
                } else {
                    Ok(Response {
                        status: 200,
                        body: Map::new(),
                    })
                }
            });
        let queue = Arc::new(TaskQueue::new());
        let worker = Worker::spawn(0, Arc::clone(&queue), executor).unwrap();

        let (tx, rx) = mpsc::channel();
        let success_tx = tx.clone();
        let on_success: SuccessCallback =
            Arc::new(move |task: &Task, _: &Response| success_tx.send(format!("ok {}", task.resource())).unwrap());
        let on_error: ErrorCallback =
            Arc::new(move |error: &RequestError, task: &Task| tx.send(format!("err {} {error}", task.resource())).unwrap());
        let callbacks = Callbacks {
            on_success: Some(on_success),
            on_error: Some(on_error),
        };

        queue.enqueue(Task::new(Request::read("down"), callbacks.clone())).unwrap();
        queue
            .enqueue(Task::new(Request::create("up", json!({})), callbacks))
            .unwrap();

        let timeout = Duration::from_secs(5);
        assert_eq!(
            rx.recv_timeout(timeout).unwrap(),
            "err down transport failure: connection refused"
        );
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "ok up");

        queue.close(1, false);
        worker.join().unwrap();
        assert_eq!(worker.processed(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn panicking_callback_does_not_kill_worker() {
        let queue = Arc::new(TaskQueue::new());
        let worker = Worker::spawn(0, Arc::clone(&queue), ok_executor()).unwrap();

        let panicking: SuccessCallback = Arc::new(|_: &Task, _: &Response| panic!("callback bug"));
        queue
            .enqueue(Task::new(
                Request::read("articles"),
                Callbacks {
                    on_success: Some(panicking),
                    on_error: None,
                },
            ))
            .unwrap();

        let (tx, rx) = mpsc::channel();
        let counting: SuccessCallback = Arc::new(move |_: &Task, _: &Response| tx.send(()).unwrap());
        queue
            .enqueue(Task::new(
                Request::read("articles"),
                Callbacks {
                    on_success: Some(counting),
                    on_error: None,
                },
            ))
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        queue.close(1, false);
        worker.join().unwrap();
        assert_eq!(worker.processed(), 2);
    }

    #[test]
    fn failure_without_callback_is_swallowed() {
        let executor: Arc<dyn RequestExecutor> =
            Arc::new(|_: &Request| -> std::result::Result<Response, RequestError> {
                Err(RequestError::Decode {
                    status: 200,
                    message: "expected value".to_string(),
                })
            });
        let queue = Arc::new(TaskQueue::new());
        let worker = Worker::spawn(0, Arc::clone(&queue), executor).unwrap();
        queue
            .enqueue(Task::new(Request::read("articles"), Callbacks::default()))
            .unwrap();
        queue.close(1, false);
        worker.join().unwrap();
        assert_eq!(worker.processed(), 1);
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}
