//! Client and task dispatcher for the Shopware REST API.
//!
//! # Overview
//! Two ways to talk to a shop:
//! - `HttpExecutor` performs one blocking call per request and returns the
//!   decoded envelope or a classified `RequestError`.
//! - `Pool` owns a fixed set of worker threads that pull `Task`s from a
//!   shared queue, execute them through any `RequestExecutor` and report
//!   back through success/error callbacks on the worker thread.
//!
//! # Design
//! - `ShopClient` is stateless: `build` produces an `HttpRequest`, `parse`
//!   consumes an `HttpResponse`. Only `HttpExecutor` touches the network.
//! - Resource payloads are opaque JSON; the crate knows the REST verbs and
//!   the `{success, data, message}` envelope, nothing else.
//! - Shutdown closes the queue and appends one sentinel per worker in a
//!   single step, so it is safe with concurrent producers.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod pool;
pub mod queue;
pub mod task;
pub mod types;
pub mod worker;

pub use client::{Credentials, ShopClient};
pub use config::PoolConfig;
pub use error::{Error, RequestError, Result};
pub use executor::{HttpExecutor, RequestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use pool::Pool;
pub use task::{Callbacks, ErrorCallback, SuccessCallback, Task, TaskId};
pub use types::{Request, Response, Verb};
pub use worker::WorkerState;
