//! In-memory stand-in for the shop REST API.
//!
//! Serves `/api/{resource}` and `/api/{resource}/{id}` for any resource name
//! with the `{success, data, message}` envelope, basic auth, list filters
//! (`filter[N][property]` / `filter[N][value]`) and `useNumberAsId` lookups
//! on `number` or `mainDetail.number`. `/api/_malformed` answers with a body
//! that is not JSON.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Objects per resource, keyed by their numeric id.
#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    resources: HashMap<String, BTreeMap<u64, Map<String, Value>>>,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    authorization: Arc<str>,
}

/// Error envelope: `{"success": false, "message": ...}` with a status code.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({"success": false, "message": self.message});
        (self.status, Json(body)).into_response()
    }
}

type Reply = Result<(StatusCode, Json<Value>), Failure>;
type Params = Query<HashMap<String, String>>;

/// Router accepting the `demo` / `demo` credentials.
pub fn app() -> Router {
    app_with_credentials("demo", "demo")
}

pub fn app_with_credentials(user: &str, key: &str) -> Router {
    let state = AppState {
        db: Db::default(),
        authorization: format!("Basic {}", STANDARD.encode(format!("{user}:{key}"))).into(),
    };
    Router::new()
        .route("/api/_malformed", get(malformed))
        .route("/api/{resource}", get(list).post(create))
        .route("/api/{resource}/{id}", get(read).put(update).delete(remove))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if supplied == Some(&*state.authorization) {
        Ok(())
    } else {
        Err(Failure::new(StatusCode::UNAUTHORIZED, "Invalid or missing auth"))
    }
}

fn location(resource: &str, id: u64) -> Value {
    json!({"id": id, "location": format!("/api/{resource}/{id}")})
}

async fn malformed() -> (StatusCode, &'static str) {
    (StatusCode::OK, "<html>this is not json</html>")
}

async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    Query(params): Params,
) -> Reply {
    authorize(&state, &headers)?;
    let filters = filters(&params);
    let store = state.db.read().await;
    let data: Vec<Value> = store
        .resources
        .get(&resource)
        .into_iter()
        .flat_map(BTreeMap::values)
        .filter(|object| {
            filters
                .iter()
                .all(|(property, expected)| field(object, property).as_deref() == Some(expected.as_str()))
        })
        .cloned()
        .map(Value::Object)
        .collect();
    let total = data.len();
    Ok((
        StatusCode::OK,
        Json(json!({"success": true, "data": data, "total": total})),
    ))
}

async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    Json(payload): Json<Value>,
) -> Reply {
    authorize(&state, &headers)?;
    let Value::Object(mut object) = payload else {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "Payload must be a JSON object"));
    };
    let mut store = state.db.write().await;
    store.next_id += 1;
    let id = store.next_id;
    object.insert("id".to_string(), json!(id));
    store.resources.entry(resource.clone()).or_default().insert(id, object);
    Ok((
        StatusCode::CREATED,
        Json(json!({"success": true, "data": location(&resource, id)})),
    ))
}

async fn read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
    Query(params): Params,
) -> Reply {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let key = find(&store, &resource, &id, &params)?;
    let object = store.resources[&resource][&key].clone();
    Ok((
        StatusCode::OK,
        Json(json!({"success": true, "data": object})),
    ))
}

async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
    Query(params): Params,
    Json(patch): Json<Value>,
) -> Reply {
    authorize(&state, &headers)?;
    let Value::Object(patch) = patch else {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "Payload must be a JSON object"));
    };
    let mut store = state.db.write().await;
    let key = find(&store, &resource, &id, &params)?;
    if let Some(object) = store
        .resources
        .get_mut(&resource)
        .and_then(|objects| objects.get_mut(&key))
    {
        merge(object, patch);
        object.insert("id".to_string(), json!(key));
    }
    Ok((
        StatusCode::OK,
        Json(json!({"success": true, "data": location(&resource, key)})),
    ))
}

async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
    Query(params): Params,
) -> Reply {
    authorize(&state, &headers)?;
    let mut store = state.db.write().await;
    let key = find(&store, &resource, &id, &params)?;
    if let Some(objects) = store.resources.get_mut(&resource) {
        objects.remove(&key);
    }
    Ok((StatusCode::OK, Json(json!({"success": true}))))
}

/// Resolve `id` to a stored key, by number when `useNumberAsId` is set.
fn find(store: &Store, resource: &str, id: &str, params: &HashMap<String, String>) -> Result<u64, Failure> {
    let not_found = || Failure::new(StatusCode::NOT_FOUND, format!("Resource by id {id} not found"));
    let objects = store.resources.get(resource).ok_or_else(not_found)?;
    let by_number = params
        .get("useNumberAsId")
        .is_some_and(|flag| flag == "true" || flag == "1");

    if by_number {
        objects
            .iter()
            .find(|(_, object)| {
                field(object, "number").as_deref() == Some(id)
                    || field(object, "mainDetail.number").as_deref() == Some(id)
            })
            .map(|(key, _)| *key)
            .ok_or_else(not_found)
    } else {
        id.parse::<u64>()
            .ok()
            .filter(|key| objects.contains_key(key))
            .ok_or_else(not_found)
    }
}

/// Pair up `filter[N][property]` and `filter[N][value]` parameters.
fn filters(params: &HashMap<String, String>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(name, property)| {
            let index = name.strip_prefix("filter[")?.strip_suffix("][property]")?;
            let value = params.get(&format!("filter[{index}][value]"))?;
            Some((property.clone(), value.clone()))
        })
        .collect()
}

/// Read a dotted path as a string; numbers and booleans are stringified.
fn field(object: &Map<String, Value>, path: &str) -> Option<String> {
    let mut parts = path.split('.');
    let mut current = object.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) => Some(current.to_string()),
        _ => None,
    }
}

/// Recursively merge `patch` into `target`; non-object values replace.
fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Object(nested) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge(existing, nested),
                _ => {
                    target.insert(key, Value::Object(nested));
                }
            },
            value => {
                target.insert(key, value);
            }
        }
    }
}
