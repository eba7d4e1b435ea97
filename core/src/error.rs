//! Error types for the client and the dispatch engine.
//!
//! # Design
//! Two enums with different audiences. `RequestError` is what one task's
//! round trip can produce; it is handed to that task's error callback and
//! never escapes a worker. `Error` covers misuse and lifecycle problems
//! reported synchronously to the caller: bad endpoints, invalid requests,
//! pushing into a pool that has been shut down.

use serde_json::Value;
use thiserror::Error;

/// The three classified outcomes of a failed round trip.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The call could not be established or completed (connect, timeout,
    /// interrupted body).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body is not a JSON object.
    #[error("failed to decode response (HTTP {status}): {message}")]
    Decode { status: u16, message: String },

    /// The remote service processed the call but reported `success: false`
    /// or an error status.
    #[error("request failed (HTTP {status}): {message}")]
    Application {
        status: u16,
        message: String,
        body: Value,
    },
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Transport(_) => None,
            RequestError::Decode { status, .. } | RequestError::Application { status, .. } => {
                Some(*status)
            }
        }
    }
}

/// Errors returned synchronously by construction and pool operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    /// The pool no longer accepts tasks.
    #[error("pool has been shut down")]
    ShutDown,

    #[error("pool must be shut down before joining")]
    NotShutDown,

    /// The worker thread died outside per-task isolation, for example from
    /// a panicking tracing layer or a panic payload whose destructor panics.
    /// Task and callback panics never surface here.
    #[error("worker {0} panicked")]
    WorkerPanicked(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
