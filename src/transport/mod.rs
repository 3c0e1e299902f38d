//! Transport collaborator
//!
//! The adapter talks to the store only through [`Transport`]: four REST
//! verbs over paths relative to the store root. Connection handling,
//! timeouts and TLS belong to the implementation.
//!
//! - `http.rs` - `reqwest` client against a running store
//! - `memory.rs` - in-process store emulation

mod http;
mod memory;

use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use crate::core::{AdapterError, Result};

pub use http::HttpTransport;
pub use memory::{MemoryStore, RecordedRequest};

/// Status and raw body of a store response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 201, the only status that confirms a create.
    pub fn is_created(&self) -> bool {
        self.status == 201
    }

    /// 200, the only status that confirms a retrieval.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<JsonValue> {
        serde_json::from_str(&self.body)
            .map_err(|e| AdapterError::Decode(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` to `path`.
    async fn create(&self, path: &str, payload: &JsonValue) -> Result<Response>;

    /// GET `path`.
    async fn retrieve(&self, path: &str) -> Result<Response>;

    /// PUT `payload` to `path`.
    async fn update(&self, path: &str, payload: &JsonValue) -> Result<Response>;

    /// DELETE `path`.
    async fn delete(&self, path: &str) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn create(&self, path: &str, payload: &JsonValue) -> Result<Response> {
        (**self).create(path, payload).await
    }

    async fn retrieve(&self, path: &str) -> Result<Response> {
        (**self).retrieve(path).await
    }

    async fn update(&self, path: &str, payload: &JsonValue) -> Result<Response> {
        (**self).update(path, payload).await
    }

    async fn delete(&self, path: &str) -> Result<Response> {
        (**self).delete(path).await
    }
}
