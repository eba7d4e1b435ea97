//! Stateless HTTP request builder and response parser for the shop API.
//!
//! # Design
//! `ShopClient` holds the endpoint, the credentials and the failure toggle
//! and carries no mutable state between calls. `build` turns a `Request`
//! into an `HttpRequest`; `parse` turns an `HttpResponse` into a decoded
//! envelope or a classified `RequestError`. The network round trip happens
//! elsewhere (`HttpExecutor`), so everything here is deterministic.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, RequestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Request, Response};

/// Backend user name and API key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub key: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            key: key.into(),
        }
    }

    /// Value for the `authorization` header.
    pub fn basic_auth(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", self.user, self.key)))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Synchronous, stateless client for the shop REST API.
#[derive(Debug, Clone)]
pub struct ShopClient {
    endpoint: Url,
    credentials: Credentials,
    raise_on_failure: bool,
}

impl ShopClient {
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let trimmed = endpoint.trim_end_matches(|c: char| c == '/' || c == '\\');
        let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("endpoint cannot carry a path".to_string()));
        }
        Ok(Self {
            endpoint: url,
            credentials,
            raise_on_failure: true,
        })
    }

    /// When disabled, `success: false` envelopes are returned as ordinary
    /// responses instead of `RequestError::Application`.
    pub fn raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn url_for(&self, request: &Request) -> String {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&request.resource);
            if let Some(id) = &request.id {
                segments.push(id);
            }
        }
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(request.params.iter());
        }
        url.into()
    }

    pub fn build(&self, request: &Request) -> HttpRequest {
        let mut headers = vec![("authorization".to_string(), self.credentials.basic_auth())];
        let body = match &request.payload {
            Some(payload) if request.has_body() => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(payload.to_string())
            }
            _ => None,
        };
        HttpRequest {
            method: HttpMethod::from(request.verb),
            url: self.url_for(request),
            headers,
            body,
        }
    }

    pub fn parse(&self, response: HttpResponse) -> Result<Response, RequestError> {
        let status = response.status;
        if status == 204 && response.body.trim().is_empty() {
            return Ok(Response {
                status,
                body: Map::new(),
            });
        }

        let value: Value = serde_json::from_str(&response.body).map_err(|e| RequestError::Decode {
            status,
            message: e.to_string(),
        })?;
        let Value::Object(body) = value else {
            return Err(RequestError::Decode {
                status,
                message: "expected a JSON object".to_string(),
            });
        };

        let success = match body.get("success") {
            Some(Value::Bool(flag)) => *flag,
            _ => response.is_success(),
        };
        if success || !self.raise_on_failure {
            return Ok(Response { status, body });
        }

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Err(RequestError::Application {
            status,
            message,
            body: Value::Object(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ShopClient {
        ShopClient::new("http://localhost:3000/api", Credentials::new("demo", "demo")).unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_read_many_has_no_body() {
        let req = client().build(&Request::read("articles"));
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/api/articles");
        assert!(req.body.is_none());
        assert_eq!(
            req.headers,
            vec![("authorization".to_string(), "Basic ZGVtbzpkZW1v".to_string())]
        );
    }

    #[test]
    fn build_create_sends_json() {
        let req = client().build(&Request::create("articles", json!({"name": "Shirt"})));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/api/articles");
        assert!(req
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string())));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "Shirt");
    }

    #[test]
    fn build_update_addresses_object() {
        let req = client().build(&Request::update("articles", "7", json!({"active": false})));
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:3000/api/articles/7");
    }

    #[test]
    fn build_encodes_params_and_segments() {
        let request = Request::read("articles")
            .param("filter[0][property]", "name")
            .param("filter[0][value]", "My first article");
        let req = client().build(&request);
        assert_eq!(
            req.url,
            "http://localhost:3000/api/articles?filter%5B0%5D%5Bproperty%5D=name&filter%5B0%5D%5Bvalue%5D=My+first+article"
        );

        let req = client().build(&Request::delete("articles", "a b/c"));
        assert_eq!(req.url, "http://localhost:3000/api/articles/a%20b%2Fc");
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let client = ShopClient::new("http://localhost:3000/api//", Credentials::new("u", "k")).unwrap();
        let req = client.build(&Request::read_one("orders", "1"));
        assert_eq!(req.url, "http://localhost:3000/api/orders/1");
    }

    #[test]
    fn relative_endpoint_is_rejected() {
        let err = ShopClient::new("shop/api", Credentials::new("u", "k")).unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
    }

    #[test]
    fn credentials_debug_hides_key() {
        let debug = format!("{:?}", Credentials::new("demo", "secret"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn parse_success_envelope() {
        let parsed = client()
            .parse(response(200, r#"{"success":true,"data":{"id":3}}"#))
            .unwrap();
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.data().unwrap()["id"], 3);
    }

    #[test]
    fn parse_success_false_is_application_failure() {
        let err = client()
            .parse(response(404, r#"{"success":false,"message":"Article by id 9 not found"}"#))
            .unwrap_err();
        match err {
            RequestError::Application { status, message, body } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Article by id 9 not found");
                assert_eq!(body["success"], false);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_error_status_without_flag_fails() {
        let err = client().parse(response(500, "{}")).unwrap_err();
        assert!(matches!(err, RequestError::Application { status: 500, ref message, .. } if message == "HTTP 500"));
    }

    #[test]
    fn parse_failure_passes_through_when_not_raising() {
        let parsed = client()
            .raise_on_failure(false)
            .parse(response(400, r#"{"success":false,"message":"nope"}"#))
            .unwrap();
        assert!(!parsed.success());
        assert_eq!(parsed.message(), Some("nope"));
    }

    #[test]
    fn parse_non_json_is_decode_failure() {
        let err = client().parse(response(200, "<html>")).unwrap_err();
        assert!(matches!(err, RequestError::Decode { status: 200, .. }));
    }

    #[test]
    fn parse_non_object_is_decode_failure() {
        let err = client().parse(response(200, "[1,2]")).unwrap_err();
        assert!(matches!(err, RequestError::Decode { .. }));
    }

    #[test]
    fn parse_empty_no_content() {
        let parsed = client().parse(response(204, "")).unwrap();
        assert!(parsed.body.is_empty());
    }
}
