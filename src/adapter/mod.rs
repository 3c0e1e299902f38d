//! CRUD Orchestrator
//!
//! [`DataAdapter`] is the capability a persistence layer programs against;
//! [`PersevereAdapter`] implements it over a [`Transport`] by composing the
//! filter translator, the attribute mapper and the schema registry.
//!
//! Each call issues its requests one after another and returns only once
//! the last one has been answered.

use async_trait::async_trait;
use log::{debug, warn};
use crate::config::AdapterConfig;
use crate::core::{AdapterError, Record, Result, Value};
use crate::mapper;
use crate::query::Query;
use crate::registry::SchemaRegistry;
use crate::transport::{HttpTransport, Transport};

/// Records an update or delete applies to: already resolved records, or a
/// query resolved through `read_many` first.
pub enum Target<'a> {
    Records(&'a mut [Record]),
    Query(&'a Query),
}

/// Attribute changes an update applies before writing: `(name, value)`.
pub type Changes = [(String, Value)];

#[async_trait]
pub trait DataAdapter: Send + Sync {
    /// Create every record, assigning store identifiers in place. Returns
    /// the number created; any failure aborts the batch.
    async fn create(&self, records: &mut [Record]) -> Result<usize>;

    /// First record matching the query.
    async fn read_one(&self, query: &Query) -> Result<Option<Record>> {
        Ok(self.read_many(query).await?.into_iter().next())
    }

    /// All records matching the query, in store order.
    async fn read_many(&self, query: &Query) -> Result<Vec<Record>>;

    /// Apply `changes` to the target records and write them back. Returns
    /// the number updated; any failure aborts the batch.
    async fn update(&self, changes: &Changes, target: Target<'_>) -> Result<usize>;

    /// Delete the target records. Failed deletes are skipped; the count
    /// only includes confirmed deletions.
    async fn delete(&self, target: Target<'_>) -> Result<usize>;
}

/// Adapter for a Persevere-style REST document store.
pub struct PersevereAdapter<T: Transport> {
    transport: T,
    registry: SchemaRegistry,
}

impl PersevereAdapter<HttpTransport> {
    /// Connect to the store described by `config`.
    pub async fn from_config(config: &AdapterConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::connect(transport).await)
    }
}

impl<T: Transport> PersevereAdapter<T> {
    /// Build the adapter, seeding the schema registry from the store's
    /// class listing. A failed listing does not prevent startup; see
    /// [`SchemaRegistry::sync_error`].
    pub async fn connect(transport: T) -> Self {
        let registry = SchemaRegistry::load(&transport).await;
        Self { transport, registry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Alias of [`DataAdapter::read_many`].
    pub async fn read(&self, query: &Query) -> Result<Vec<Record>> {
        self.read_many(query).await
    }

    async fn create_record(&self, record: &mut Record) -> Result<()> {
        let kind = record.kind().clone();
        self.registry
            .ensure_registered(&self.transport, kind.collection_name())
            .await?;

        let path = kind.collection_path();
        let payload = mapper::to_payload(record);
        debug!("POST {}", path);

        let response = self.transport.create(&path, &payload).await?;
        if !response.is_created() {
            return Err(AdapterError::status("POST", &path, response.status, &response.body));
        }

        mapper::merge_into(record, &response.json()?)
    }

    /// The record only takes the changes once the store has accepted them.
    async fn update_record(&self, record: &mut Record, changes: &Changes) -> Result<()> {
        let mut updated = record.clone();
        apply_changes(&mut updated, changes)?;
        let path = record_path(&updated)?;
        let payload = mapper::to_payload(&updated);
        debug!("PUT {}", path);

        let response = self.transport.update(&path, &payload).await?;
        if !response.is_success() {
            return Err(AdapterError::status("PUT", &path, response.status, &response.body));
        }
        *record = updated;
        Ok(())
    }

    async fn delete_record(&self, record: &Record) -> Result<()> {
        let path = record_path(record)?;
        debug!("DELETE {}", path);

        let response = self.transport.delete(&path).await?;
        if !response.is_success() {
            return Err(AdapterError::status("DELETE", &path, response.status, &response.body));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> DataAdapter for PersevereAdapter<T> {
    async fn create(&self, records: &mut [Record]) -> Result<usize> {
        let mut created = 0;
        for record in records.iter_mut() {
            if let Err(err) = self.create_record(record).await {
                return Err(aborted("create", created, err));
            }
            created += 1;
        }
        Ok(created)
    }

    async fn read_many(&self, query: &Query) -> Result<Vec<Record>> {
        let path = query.path()?;
        debug!("GET {}", path);

        let response = self.transport.retrieve(&path).await?;
        if !response.is_ok() {
            return Err(AdapterError::status("GET", &path, response.status, &response.body));
        }

        let body = response.json()?;
        let items = body
            .as_array()
            .ok_or_else(|| AdapterError::Decode(format!("expected JSON array from {}", path)))?;

        items
            .iter()
            .map(|item| mapper::from_json(query.kind(), item, query.projection()))
            .collect()
    }

    async fn update(&self, changes: &Changes, target: Target<'_>) -> Result<usize> {
        let mut resolved;
        let records: &mut [Record] = match target {
            Target::Records(records) => records,
            Target::Query(query) => {
                resolved = self.read_many(query).await?;
                &mut resolved
            }
        };

        let mut updated = 0;
        for record in records.iter_mut() {
            if let Err(err) = self.update_record(record, changes).await {
                return Err(aborted("update", updated, err));
            }
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, target: Target<'_>) -> Result<usize> {
        let resolved;
        let records: &[Record] = match target {
            Target::Records(records) => records,
            Target::Query(query) => {
                resolved = self.read_many(query).await?;
                &resolved
            }
        };

        let mut deleted = 0;
        for record in records {
            match self.delete_record(record).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!("skipping delete of {} record: {}", record.kind().name(), err),
            }
        }
        Ok(deleted)
    }
}

/// `/<CollectionName>/<id>`
fn record_path(record: &Record) -> Result<String> {
    let id = record
        .id()
        .ok_or_else(|| AdapterError::MissingIdentifier(record.kind().name().to_string()))?;
    Ok(format!("{}{}", record.kind().collection_path(), id))
}

/// Cast each change to its declared attribute type and set it. Names the
/// kind does not declare are ignored.
fn apply_changes(record: &mut Record, changes: &Changes) -> Result<()> {
    for (name, value) in changes {
        let Some(attribute) = record.kind().get_attribute(name) else {
            debug!("ignoring change to undeclared attribute {}", name);
            continue;
        };
        if attribute.name == record.kind().key_attribute().name {
            continue;
        }
        let value = value.cast(&attribute.data_type)?;
        record.set(name, value);
    }
    Ok(())
}

fn aborted(operation: &'static str, completed: usize, source: AdapterError) -> AdapterError {
    AdapterError::BatchAborted {
        operation,
        completed,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, RecordId, RecordKind};
    use crate::query::Operator;
    use crate::transport::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn books() -> Arc<RecordKind> {
        Arc::new(
            RecordKind::new("Book")
                .attribute("title", DataType::String)
                .attribute("author", DataType::String)
                .attribute("year", DataType::Integer),
        )
    }

    #[tokio::test]
    async fn test_create_registers_class_then_posts() {
        let adapter = PersevereAdapter::connect(MemoryStore::new()).await;
        let mut records = vec![Record::new(books()).with("title", "Dune").with("author", "Herbert")];

        let created = adapter.create(&mut records).await.unwrap();

        assert_eq!(created, 1);
        assert_eq!(records[0].id(), Some(&RecordId::Text("1".to_string())));

        let requests = adapter.transport().requests();
        let writes: Vec<_> = requests
            .iter()
            .filter(|r| r.method == "POST")
            .map(|r| r.path.as_str())
            .collect();
        assert_eq!(writes, vec!["/Class/", "/Books/"]);
        assert_eq!(requests.last().unwrap().body, Some(json!({"title": "Dune", "author": "Herbert"})));
    }

    #[tokio::test]
    async fn test_read_one_returns_first_match() {
        let store = MemoryStore::new();
        store.seed("Books", json!({"title": "Dune", "year": 1965})).unwrap();
        store.seed("Books", json!({"title": "Emma", "year": 1815})).unwrap();
        let adapter = PersevereAdapter::connect(store).await;

        let query = Query::new(books()).filter(Operator::Lt, "year", 1900);
        let record = adapter.read_one(&query).await.unwrap().unwrap();
        assert_eq!(record.get("title"), Some(&Value::from("Emma")));

        let none = Query::new(books()).filter(Operator::Gt, "year", 3000);
        assert!(adapter.read_one(&none).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_record_without_identifier() {
        let adapter = PersevereAdapter::connect(MemoryStore::new()).await;
        let mut records = vec![Record::new(books()).with("title", "Dune")];

        let err = adapter.update(&[], Target::Records(&mut records)).await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::BatchAborted { completed: 0, ref source, .. }
                if matches!(**source, AdapterError::MissingIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_record_untouched() {
        let store = MemoryStore::new();
        store.seed("Books", json!({"title": "Dune", "year": 1965})).unwrap();
        store.fail_on("PUT", "/Books/", 500);
        let adapter = PersevereAdapter::connect(store).await;

        let mut records = adapter.read_many(&Query::new(books())).await.unwrap();
        let changes = [("title".to_string(), Value::from("Dune Messiah"))];
        let err = adapter.update(&changes, Target::Records(&mut records)).await.unwrap_err();

        assert!(matches!(err, AdapterError::BatchAborted { completed: 0, .. }));
        assert_eq!(records[0].get("title"), Some(&Value::from("Dune")));
        assert_eq!(adapter.transport().documents("Books")[0]["title"], "Dune");

        adapter.transport().clear_failures();
        adapter.update(&changes, Target::Records(&mut records)).await.unwrap();
        assert_eq!(records[0].get("title"), Some(&Value::from("Dune Messiah")));
    }

    #[test]
    fn test_apply_changes_casts_and_skips_key() {
        let mut record = Record::new(books());
        apply_changes(
            &mut record,
            &[
                ("year".to_string(), Value::from("1965")),
                ("id".to_string(), Value::from("99")),
                ("isbn".to_string(), Value::from("x")),
            ],
        )
        .unwrap();

        assert_eq!(record.get("year"), Some(&Value::Integer(1965)));
        assert!(!record.is_set("id"));
        assert!(!record.is_set("isbn"));

        let err = apply_changes(&mut record, &[("year".to_string(), Value::from("soon"))]).unwrap_err();
        assert!(matches!(err, AdapterError::TypeCoercion(_)));
    }
}
