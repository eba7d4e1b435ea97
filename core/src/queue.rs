//! Unbounded FIFO queue shared by producers and workers.
//!
//! # Design
//! A `VecDeque` behind a `parking_lot::Mutex`, with a `Condvar` to park
//! idle workers. Every mutation happens under the one lock, which is what
//! makes `close` safe against concurrent producers: draining, flipping the
//! closed flag and appending the shutdown sentinels is a single critical
//! section, so a racing `enqueue` either lands before it (and is drained or
//! run) or is rejected after it. No sentinel can be overtaken by a task.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::task::Task;

/// An item handed to a worker.
#[derive(Debug)]
pub enum Job {
    Run(Task),
    /// Terminates the worker that dequeues it.
    Shutdown,
}

#[derive(Debug, Default)]
struct State {
    jobs: VecDeque<Job>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<State>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task. Never blocks on consumers; hands the task back if the
    /// queue has been closed.
    pub fn enqueue(&self, task: Task) -> Result<(), Task> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(task);
        }
        state.jobs.push_back(Job::Run(task));
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Block until a job is available and remove it.
    pub fn dequeue(&self) -> Job {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                return job;
            }
            self.available.wait(&mut state);
        }
    }

    /// Discard every pending task and return how many were removed.
    /// Sentinels already in the queue are kept.
    pub fn drain(&self) -> usize {
        let mut state = self.state.lock();
        discard_tasks(&mut state.jobs)
    }

    /// Stop accepting tasks and append `sentinels` shutdown jobs, discarding
    /// pending tasks first when `discard_pending` is set. Returns the number of
    /// discarded tasks, or `None` if the queue was already closed.
    pub fn close(&self, sentinels: usize, discard_pending: bool) -> Option<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let drained = if discard_pending {
            discard_tasks(&mut state.jobs)
        } else {
            0
        };
        state.closed = true;
        state.jobs.extend((0..sentinels).map(|_| Job::Shutdown));
        drop(state);
        self.available.notify_all();
        Some(drained)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of tasks waiting, sentinels excluded.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .jobs
            .iter()
            .filter(|job| matches!(job, Job::Run(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn discard_tasks(jobs: &mut VecDeque<Job>) -> usize {
    let before = jobs.len();
    jobs.retain(|job| matches!(job, Job::Shutdown));
    before - jobs.len()
}
