//! In-process store
//!
//! Emulates the REST surface the adapter relies on: class registration and
//! listing under `/Class`, per-collection create, filtered retrieval,
//! update and delete. Every request is recorded, and failures can be
//! injected per method and path prefix.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue, json};
use crate::core::{AdapterError, Result};
use crate::mapper::value_to_json;
use crate::query::{FilterTerm, Operator, parse_filter};
use super::{Response, Transport};

const CLASS_PATH: &str = "/Class/";
const CLASS_LISTING_PATH: &str = "/Class[=id]";

/// A request as the store received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<JsonValue>,
}

#[derive(Debug)]
struct FailureRule {
    method: &'static str,
    path_prefix: String,
    /// Matching requests still allowed through before the rule fires.
    skip: usize,
    status: Option<u16>,
}

#[derive(Debug, Default)]
struct Collection {
    next_id: u64,
    documents: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Default)]
struct StoreState {
    classes: Vec<String>,
    collections: HashMap<String, Collection>,
    requests: Vec<RecordedRequest>,
    failures: Vec<FailureRule>,
}

/// In-memory emulation of the document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with `collection` already registered.
    pub fn with_class(self, collection: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.register(collection);
        }
        self
    }

    /// Insert a document directly, bypassing request recording. Returns the
    /// assigned identifier.
    pub fn seed(&self, collection: &str, document: JsonValue) -> Result<String> {
        let mut state = self.lock("SEED", collection)?;
        state.register(collection);
        let obj = document
            .as_object()
            .cloned()
            .ok_or_else(|| AdapterError::Decode("seed document must be an object".to_string()))?;
        Ok(state.insert(collection, obj))
    }

    /// Answer requests matching `method` and `path_prefix` with `status`.
    pub fn fail_on(&self, method: &'static str, path_prefix: &str, status: u16) {
        self.fail_after(method, path_prefix, 0, status);
    }

    /// Let `skip` matching requests through, then answer the rest with
    /// `status`.
    pub fn fail_after(&self, method: &'static str, path_prefix: &str, skip: usize, status: u16) {
        self.push_rule(method, path_prefix, skip, Some(status));
    }

    /// Fail matching requests at the connection level.
    pub fn disconnect_on(&self, method: &'static str, path_prefix: &str) {
        self.push_rule(method, path_prefix, 0, None);
    }

    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.clear();
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }

    /// Number of recorded requests with `method` whose path starts with
    /// `path_prefix`.
    pub fn request_count(&self, method: &str, path_prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .count()
    }

    pub fn classes(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.classes.clone())
            .unwrap_or_default()
    }

    /// Stored documents of `collection`, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<JsonValue> {
        self.state
            .lock()
            .ok()
            .and_then(|state| {
                state.collections.get(collection).map(|c| {
                    c.documents.iter().cloned().map(JsonValue::Object).collect()
                })
            })
            .unwrap_or_default()
    }

    fn push_rule(&self, method: &'static str, path_prefix: &str, skip: usize, status: Option<u16>) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.push(FailureRule {
                method,
                path_prefix: path_prefix.to_string(),
                skip,
                status,
            });
        }
    }

    fn lock(&self, method: &'static str, path: &str) -> Result<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|e| AdapterError::Transport {
            method,
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    fn handle(&self, method: &'static str, path: &str, body: Option<&JsonValue>) -> Result<Response> {
        let mut state = self.lock(method, path)?;
        state.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        if let Some(status) = state.injected_failure(method, path) {
            return match status {
                Some(status) => Ok(Response::new(status, r#"{"error":"injected failure"}"#)),
                None => Err(AdapterError::Transport {
                    method,
                    path: path.to_string(),
                    message: "connection reset".to_string(),
                }),
            };
        }

        Ok(match (method, path) {
            ("GET", CLASS_LISTING_PATH) => state.list_classes(),
            ("POST", CLASS_PATH) => state.create_class(body),
            ("POST", _) => state.create_document(path, body),
            ("GET", _) => state.retrieve(path),
            ("PUT", _) => state.update_document(path, body),
            ("DELETE", _) => state.delete_document(path),
            _ => Response::new(405, ""),
        })
    }
}

impl StoreState {
    fn injected_failure(&mut self, method: &str, path: &str) -> Option<Option<u16>> {
        let rule = self
            .failures
            .iter_mut()
            .find(|rule| rule.method == method && path.starts_with(&rule.path_prefix))?;
        if rule.skip > 0 {
            rule.skip -= 1;
            return None;
        }
        Some(rule.status)
    }

    fn register(&mut self, collection: &str) {
        if !self.classes.iter().any(|c| c == collection) {
            self.classes.push(collection.to_string());
        }
        self.collections.entry(collection.to_string()).or_default();
    }

    fn insert(&mut self, collection: &str, mut obj: Map<String, JsonValue>) -> String {
        let entry = self.collections.entry(collection.to_string()).or_default();
        entry.next_id += 1;
        let id = entry.next_id.to_string();
        obj.insert("id".to_string(), JsonValue::String(id.clone()));
        entry.documents.push(obj);
        id
    }

    fn list_classes(&self) -> Response {
        let names: Vec<String> = self.classes.iter().map(|c| format!("Class/{}", c)).collect();
        Response::new(200, json!(names).to_string())
    }

    fn create_class(&mut self, body: Option<&JsonValue>) -> Response {
        let Some(name) = body.and_then(|b| b.get("id")).and_then(JsonValue::as_str) else {
            return Response::new(400, r#"{"error":"class id required"}"#);
        };
        if self.classes.iter().any(|c| c == name) {
            return Response::new(409, format!(r#"{{"error":"class {} exists"}}"#, name));
        }
        let name = name.to_string();
        self.register(&name);
        let extends = body.and_then(|b| b.get("extends")).cloned().unwrap_or(JsonValue::Null);
        Response::new(201, json!({"id": format!("Class/{}", name), "extends": extends}).to_string())
    }

    fn create_document(&mut self, path: &str, body: Option<&JsonValue>) -> Response {
        let (collection, rest) = split_path(path);
        if !rest.is_empty() {
            return Response::new(405, "");
        }
        if !self.classes.iter().any(|c| c == collection) {
            return Response::new(404, format!(r#"{{"error":"no class {}"}}"#, collection));
        }
        let Some(obj) = body.and_then(JsonValue::as_object).cloned() else {
            return Response::new(400, r#"{"error":"object expected"}"#);
        };
        let id = self.insert(collection, obj);
        let stored = self.find(collection, &id).cloned().unwrap_or_default();
        Response::new(201, JsonValue::Object(stored).to_string())
    }

    fn retrieve(&self, path: &str) -> Response {
        let (collection, rest) = split_path(path);
        let Some(entry) = self.collections.get(collection) else {
            return Response::new(404, format!(r#"{{"error":"no class {}"}}"#, collection));
        };

        if rest.is_empty() || rest.starts_with('?') {
            let terms = match parse_filter(rest) {
                Ok(terms) => terms,
                Err(e) => return Response::new(400, json!({"error": e.to_string()}).to_string()),
            };
            let matches: Vec<JsonValue> = entry
                .documents
                .iter()
                .filter(|doc| terms.iter().all(|term| term_matches(doc, term)))
                .cloned()
                .map(JsonValue::Object)
                .collect();
            return Response::new(200, JsonValue::Array(matches).to_string());
        }

        match self.find(collection, rest) {
            Some(doc) => Response::new(200, JsonValue::Object(doc.clone()).to_string()),
            None => Response::new(404, ""),
        }
    }

    fn update_document(&mut self, path: &str, body: Option<&JsonValue>) -> Response {
        let (collection, id) = split_path(path);
        let Some(changes) = body.and_then(JsonValue::as_object) else {
            return Response::new(400, r#"{"error":"object expected"}"#);
        };
        let Some(doc) = self.find_mut(collection, id) else {
            return Response::new(404, "");
        };
        for (key, value) in changes {
            if key != "id" {
                doc.insert(key.clone(), value.clone());
            }
        }
        Response::new(200, JsonValue::Object(doc.clone()).to_string())
    }

    fn delete_document(&mut self, path: &str) -> Response {
        let (collection, id) = split_path(path);
        let Some(entry) = self.collections.get_mut(collection) else {
            return Response::new(404, "");
        };
        let before = entry.documents.len();
        entry.documents.retain(|doc| doc.get("id").and_then(JsonValue::as_str) != Some(id));
        if entry.documents.len() == before {
            return Response::new(404, "");
        }
        Response::new(204, "")
    }

    fn find(&self, collection: &str, id: &str) -> Option<&Map<String, JsonValue>> {
        self.collections
            .get(collection)?
            .documents
            .iter()
            .find(|doc| doc.get("id").and_then(JsonValue::as_str) == Some(id))
    }

    fn find_mut(&mut self, collection: &str, id: &str) -> Option<&mut Map<String, JsonValue>> {
        self.collections
            .get_mut(collection)?
            .documents
            .iter_mut()
            .find(|doc| doc.get("id").and_then(JsonValue::as_str) == Some(id))
    }
}

/// `/Books/?a=1` -> (`Books`, `?a=1`); `/Books/3` -> (`Books`, `3`).
fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.find(['/', '?']) {
        Some(idx) => {
            let (collection, rest) = trimmed.split_at(idx);
            (collection, rest.strip_prefix('/').unwrap_or(rest))
        }
        None => (trimmed, ""),
    }
}

fn term_matches(doc: &Map<String, JsonValue>, term: &FilterTerm) -> bool {
    let Some(actual) = doc.get(&term.field) else {
        return term.operator == Operator::Not && !term.value.is_null();
    };
    let expected = value_to_json(&term.value);

    match term.operator {
        Operator::Like => match (actual.as_str(), term.value.as_str()) {
            (Some(actual), Some(needle)) => actual.contains(needle),
            _ => false,
        },
        Operator::Eql => compare(actual, &expected) == Some(Ordering::Equal),
        Operator::Not => compare(actual, &expected) != Some(Ordering::Equal),
        Operator::Lt => compare(actual, &expected) == Some(Ordering::Less),
        Operator::Gt => compare(actual, &expected) == Some(Ordering::Greater),
        Operator::Lte => matches!(compare(actual, &expected), Some(Ordering::Less | Ordering::Equal)),
        Operator::Gte => matches!(compare(actual, &expected), Some(Ordering::Greater | Ordering::Equal)),
        Operator::In => false,
    }
}

fn compare(actual: &JsonValue, expected: &JsonValue) -> Option<Ordering> {
    match (actual, expected) {
        (JsonValue::Null, JsonValue::Null) => Some(Ordering::Equal),
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[async_trait]
impl Transport for MemoryStore {
    async fn create(&self, path: &str, payload: &JsonValue) -> Result<Response> {
        self.handle("POST", path, Some(payload))
    }

    async fn retrieve(&self, path: &str) -> Result<Response> {
        self.handle("GET", path, None)
    }

    async fn update(&self, path: &str, payload: &JsonValue) -> Result<Response> {
        self.handle("PUT", path, Some(payload))
    }

    async fn delete(&self, path: &str) -> Result<Response> {
        self.handle("DELETE", path, None)
    }
}
