//! Verify `ShopClient::build` and `ShopClient::parse` against the JSON
//! vectors stored in `test-vectors/`.
//!
//! Bodies are compared as parsed JSON (not raw strings) so field ordering
//! does not matter.

use serde_json::Value;
use shopware_client::{Credentials, HttpMethod, HttpResponse, Request, RequestError, ShopClient};

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[test]
fn build_test_vectors() {
    let raw = include_str!("../../test-vectors/build.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let client = ShopClient::new(
        vectors["endpoint"].as_str().unwrap(),
        Credentials::new(
            vectors["user"].as_str().unwrap(),
            vectors["key"].as_str().unwrap(),
        ),
    )
    .unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let request: Request = serde_json::from_value(case["request"].clone()).unwrap();
        request.validate().unwrap_or_else(|e| panic!("{name}: {e}"));
        let expected = &case["expected_request"];

        let req = client.build(&request);
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let pair = h.as_array().unwrap();
                (pair[0].as_str().unwrap().to_string(), pair[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        let body = req
            .body
            .as_deref()
            .map(|b| serde_json::from_str::<Value>(b).unwrap())
            .unwrap_or(Value::Null);
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

#[test]
fn parse_test_vectors() {
    let raw = include_str!("../../test-vectors/parse.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let client = ShopClient::new("http://shop.test/api", Credentials::new("demo", "demo")).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let expected = &case["expected"];

        match (expected["outcome"].as_str().unwrap(), client.parse(response)) {
            ("ok", Ok(parsed)) => {
                assert_eq!(Value::Object(parsed.body), expected["body"], "{name}: body");
            }
            ("application", Err(RequestError::Application { status, message, .. })) => {
                assert_eq!(u64::from(status), expected["status"].as_u64().unwrap(), "{name}: status");
                assert_eq!(message, expected["message"].as_str().unwrap(), "{name}: message");
            }
            ("decode", Err(RequestError::Decode { status, .. })) => {
                assert_eq!(u64::from(status), expected["status"].as_u64().unwrap(), "{name}: status");
            }
            (outcome, other) => panic!("{name}: expected {outcome}, got {other:?}"),
        }
    }
}
