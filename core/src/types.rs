//! Request and response model shared by the client and the dispatch engine.
//!
//! # Design
//! Resource payloads are opaque `serde_json::Value`s; the crate knows the
//! REST verbs and the success envelope, nothing about articles or orders.
//! `Request` is built through per-verb constructors so the common shapes are
//! valid by construction, and `validate` catches the rest before a request
//! reaches the queue.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Query parameter that makes the remote side resolve `id` as an order or
/// article number instead of a primary key.
pub const USE_NUMBER_AS_ID: &str = "useNumberAsId";

/// One of the four REST operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Create => "CREATE",
            Verb::Read => "READ",
            Verb::Update => "UPDATE",
            Verb::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Description of a single remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub verb: Verb,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl Request {
    fn new(verb: Verb, resource: impl Into<String>) -> Self {
        Self {
            verb,
            resource: resource.into(),
            id: None,
            payload: None,
            params: BTreeMap::new(),
        }
    }

    pub fn create(resource: impl Into<String>, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::new(Verb::Create, resource)
        }
    }

    /// Read a whole collection.
    pub fn read(resource: impl Into<String>) -> Self {
        Self::new(Verb::Read, resource)
    }

    pub fn read_one(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(Verb::Read, resource)
        }
    }

    pub fn update(resource: impl Into<String>, id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Some(id.into()),
            payload: Some(payload),
            ..Self::new(Verb::Update, resource)
        }
    }

    pub fn delete(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(Verb::Delete, resource)
        }
    }

    /// Append a query parameter. A repeated key keeps the last value.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Address the object by its number rather than its id.
    pub fn by_number(self) -> Self {
        self.param(USE_NUMBER_AS_ID, "true")
    }

    /// Whether the payload is sent with this verb.
    pub fn has_body(&self) -> bool {
        matches!(self.verb, Verb::Create | Verb::Update) && self.payload.is_some()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.resource.trim().is_empty() {
            return Err(Error::InvalidRequest("resource must not be empty".to_string()));
        }
        match self.verb {
            Verb::Create if self.id.is_some() => {
                return Err(Error::InvalidRequest("create does not take an id".to_string()));
            }
            Verb::Update | Verb::Delete if self.id.is_none() => {
                return Err(Error::InvalidRequest(format!("{} requires an id", self.verb)));
            }
            _ => {}
        }
        if matches!(self.verb, Verb::Create | Verb::Update) && self.payload.is_none() {
            return Err(Error::InvalidRequest(format!("{} requires a payload", self.verb)));
        }
        Ok(())
    }
}

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Map<String, Value>,
}

impl Response {
    /// The `data` member: the object for single reads, an array for lists,
    /// `{id, location}` for writes.
    pub fn data(&self) -> Option<&Value> {
        self.body.get("data")
    }

    /// The `total` member of list responses.
    pub fn total(&self) -> Option<u64> {
        self.body.get("total").and_then(Value::as_u64)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// The remote `success` flag, `true` when absent.
    pub fn success(&self) -> bool {
        self.body.get("success").and_then(Value::as_bool).unwrap_or(true)
    }
}
