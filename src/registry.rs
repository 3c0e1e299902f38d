//! Schema Registry
//!
//! The store only accepts records into collections whose class has been
//! registered. The registry remembers which collections are known to have
//! a class, seeded from the store's class listing when the adapter starts,
//! and registers missing classes on first write.

use std::collections::HashSet;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use crate::core::{AdapterError, Result};
use crate::transport::Transport;

pub const CLASS_PATH: &str = "/Class/";
pub const CLASS_LISTING_PATH: &str = "/Class[=id]";
pub const BASE_CLASS: &str = "/Class/Object";

/// Registration payload: `{"id": "Books", "extends": {"$ref": "/Class/Object"}}`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassDefinition {
    pub id: String,
    pub extends: ClassRef,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassRef {
    #[serde(rename = "$ref")]
    pub reference: String,
}

impl ClassDefinition {
    pub fn new(collection: &str) -> Self {
        Self {
            id: collection.to_string(),
            extends: ClassRef {
                reference: BASE_CLASS.to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    known: Mutex<HashSet<String>>,
    sync_error: Option<AdapterError>,
}

impl SchemaRegistry {
    /// Empty registry; every collection is registered on first write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded from the store's class listing. A failed listing is
    /// logged and kept in [`SchemaRegistry::sync_error`]; the registry then
    /// starts empty.
    pub async fn load<T: Transport + ?Sized>(transport: &T) -> Self {
        match fetch_classes(transport).await {
            Ok(names) => {
                info!("schema registry loaded {} class(es)", names.len());
                Self {
                    known: Mutex::new(names.into_iter().collect()),
                    sync_error: None,
                }
            }
            Err(err) => {
                warn!("error retrieving existing classes, starting empty: {}", err);
                Self {
                    known: Mutex::new(HashSet::new()),
                    sync_error: Some(err),
                }
            }
        }
    }

    /// Why the startup listing failed, if it did.
    pub fn sync_error(&self) -> Option<&AdapterError> {
        self.sync_error.as_ref()
    }

    pub async fn is_registered(&self, collection: &str) -> bool {
        self.known.lock().await.contains(collection)
    }

    /// Known collection names, sorted.
    pub async fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.known.lock().await.iter().cloned().collect();
        names.sort();
        names
    }

    /// Make sure `collection` has a class in the store, registering it if
    /// it is not known yet. Returns true when a registration request was
    /// sent. The lock is held across the request, so concurrent callers for
    /// the same collection register it once.
    pub async fn ensure_registered<T: Transport + ?Sized>(&self, transport: &T, collection: &str) -> Result<bool> {
        let mut known = self.known.lock().await;
        if known.contains(collection) {
            return Ok(false);
        }

        let payload = serde_json::to_value(ClassDefinition::new(collection))?;
        let registration_error = |reason: String| AdapterError::Registration {
            collection: collection.to_string(),
            reason,
        };

        let response = transport
            .create(CLASS_PATH, &payload)
            .await
            .map_err(|e| registration_error(e.to_string()))?;
        if !response.is_success() {
            return Err(registration_error(format!(
                "status {}: {}",
                response.status, response.body
            )));
        }

        info!("registered class {}", collection);
        known.insert(collection.to_string());
        Ok(true)
    }
}

/// GET the class listing and keep the segment after the last `/` of each
/// entry.
async fn fetch_classes<T: Transport + ?Sized>(transport: &T) -> Result<Vec<String>> {
    let response = transport.retrieve(CLASS_LISTING_PATH).await?;
    if !response.is_ok() {
        return Err(AdapterError::status("GET", CLASS_LISTING_PATH, response.status, &response.body));
    }

    let entries: Vec<String> = serde_json::from_str(&response.body)
        .map_err(|e| AdapterError::Decode(format!("class listing: {}", e)))?;

    Ok(entries
        .iter()
        .filter_map(|entry| entry.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}
