//! Request execution: one blocking round trip per `Request`.
//!
//! # Design
//! `RequestExecutor` is the seam between the dispatch engine and the
//! network. Workers only ever see the trait, so tests plug in closures and
//! the pool never knows about HTTP. `HttpExecutor` is the production
//! implementation: `ShopClient` builds and parses, a `ureq::Agent` moves
//! the bytes. Status codes are returned as data (`http_status_as_error`
//! off) so classification stays in `ShopClient::parse`.
//!
//! A response that arrived but cannot be read as text is a decode failure,
//! not a transport one: a body that is not UTF-8, or one larger than the
//! executor's body limit. Only I/O errors while reading stay `Transport`.

use std::time::Duration;

use serde_json::Value;
use ureq::typestate::WithBody;
use ureq::{Agent, Body, RequestBuilder};

use crate::client::{Credentials, ShopClient};
use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::error::{Error, RequestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Request, Response};

/// Performs one synchronous call per request. Implementations must not
/// retry and must report exactly one outcome.
pub trait RequestExecutor: Send + Sync {
    fn execute(&self, request: &Request) -> Result<Response, RequestError>;
}

impl<F> RequestExecutor for F
where
    F: Fn(&Request) -> Result<Response, RequestError> + Send + Sync,
{
    fn execute(&self, request: &Request) -> Result<Response, RequestError> {
        self(request)
    }
}

/// Executes requests against the shop API over HTTP.
#[derive(Clone)]
pub struct HttpExecutor {
    client: ShopClient,
    agent: Agent,
    max_body: u64,
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("endpoint", &self.client.endpoint())
            .field("max_body", &self.max_body)
            .finish_non_exhaustive()
    }
}

impl HttpExecutor {
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, Error> {
        Ok(Self::from_client(ShopClient::new(endpoint, credentials)?, None))
    }

    pub fn from_client(client: ShopClient, timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            client,
            agent,
            max_body: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Largest response body accepted, in bytes.
    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body = limit;
        self
    }

    pub fn client(&self) -> &ShopClient {
        &self.client
    }

    /// Perform the round trip for an already built request.
    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        tracing::debug!(method = method.as_str(), %url, "sending request");
        let result = match method {
            HttpMethod::Get => with_headers(self.agent.get(&url), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&url), &headers).call(),
            HttpMethod::Post => send_body(with_headers(self.agent.post(&url), &headers), body),
            HttpMethod::Put => send_body(with_headers(self.agent.put(&url), &headers), body),
        };

        let mut response = result.map_err(|e| RequestError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_body)
            .read_to_vec()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(limit) => RequestError::Decode {
                    status,
                    message: format!("response body exceeds {limit} bytes"),
                },
                other => RequestError::Transport(other.to_string()),
            })?;
        let body = String::from_utf8(bytes).map_err(|e| RequestError::Decode {
            status,
            message: format!("response body is not UTF-8: {e}"),
        })?;
        tracing::debug!(status, %url, "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Synchronous convenience surface
    // -----------------------------------------------------------------------

    pub fn create(&self, resource: &str, payload: Value) -> Result<Response, RequestError> {
        self.execute(&Request::create(resource, payload))
    }

    pub fn read(&self, resource: &str) -> Result<Response, RequestError> {
        self.execute(&Request::read(resource))
    }

    pub fn read_one(&self, resource: &str, id: &str) -> Result<Response, RequestError> {
        self.execute(&Request::read_one(resource, id))
    }

    pub fn update(&self, resource: &str, id: &str, payload: Value) -> Result<Response, RequestError> {
        self.execute(&Request::update(resource, id, payload))
    }

    pub fn delete(&self, resource: &str, id: &str) -> Result<Response, RequestError> {
        self.execute(&Request::delete(resource, id))
    }

    /// Same as `read_one` with `useNumberAsId=true`.
    pub fn read_by_number(&self, resource: &str, number: &str) -> Result<Response, RequestError> {
        self.execute(&Request::read_one(resource, number).by_number())
    }

    pub fn update_by_number(
        &self,
        resource: &str,
        number: &str,
        payload: Value,
    ) -> Result<Response, RequestError> {
        self.execute(&Request::update(resource, number, payload).by_number())
    }

    pub fn delete_by_number(&self, resource: &str, number: &str) -> Result<Response, RequestError> {
        self.execute(&Request::delete(resource, number).by_number())
    }
}

impl RequestExecutor for HttpExecutor {
    fn execute(&self, request: &Request) -> Result<Response, RequestError> {
        let response = self.send(self.client.build(request))?;
        self.client.parse(response)
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: RequestBuilder<WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
