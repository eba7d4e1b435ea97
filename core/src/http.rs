//! HTTP transport types for the host-does-IO split.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data.
//! `ShopClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; `HttpExecutor` is the only place that
//! performs the round trip. Keeping the two apart lets the URL/decoding
//! rules be tested against fixtures with no server running.

use crate::types::Verb;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<Verb> for HttpMethod {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Create => HttpMethod::Post,
            Verb::Read => HttpMethod::Get,
            Verb::Update => HttpMethod::Put,
            Verb::Delete => HttpMethod::Delete,
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `ShopClient::build`. `url` is absolute and already carries the
/// encoded query string.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
