//! Units of work handed to the worker pool.
//!
//! # Design
//! A `Task` is a `Request` plus the callbacks that were resolved when it
//! was pushed. Fields are private and there are no setters, so a task is
//! immutable from the moment it is queued: replacing the pool defaults
//! later never changes which callback an already queued task fires.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::RequestError;
use crate::types::{Request, Response, Verb};

pub type TaskId = Uuid;

/// Invoked on the worker thread after a successful round trip.
pub type SuccessCallback = Arc<dyn Fn(&Task, &Response) + Send + Sync>;

/// Invoked on the worker thread after a failed round trip.
pub type ErrorCallback = Arc<dyn Fn(&RequestError, &Task) + Send + Sync>;

/// A success/error callback pair. Either slot may be empty.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_success: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl Callbacks {
    /// Fill empty slots from `defaults`.
    pub fn or(self, defaults: &Callbacks) -> Callbacks {
        Callbacks {
            on_success: self.on_success.or_else(|| defaults.on_success.clone()),
            on_error: self.on_error.or_else(|| defaults.on_error.clone()),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

pub struct Task {
    id: TaskId,
    request: Request,
    callbacks: Callbacks,
}

impl Task {
    pub(crate) fn new(request: Request, callbacks: Callbacks) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            callbacks,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn verb(&self) -> Verb {
        self.request.verb
    }

    pub fn resource(&self) -> &str {
        &self.request.resource
    }

    pub fn on_success(&self) -> Option<&SuccessCallback> {
        self.callbacks.on_success.as_ref()
    }

    pub fn on_error(&self) -> Option<&ErrorCallback> {
        self.callbacks.on_error.as_ref()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
