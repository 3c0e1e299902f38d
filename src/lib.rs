// ============================================================================
// Persevere Adapter Library
// ============================================================================

//! Persistence adapter for a Persevere-style REST document store.
//!
//! Typed records and declarative queries go in; REST requests against
//! per-kind collections come out. Classes for new collections are
//! registered on first write.
//!
//! ```ignore
//! use persevere_adapter::{AdapterConfig, DataAdapter, DataType, Operator, PersevereAdapter, Query, Record, RecordKind};
//! use std::sync::Arc;
//!
//! let adapter = PersevereAdapter::from_config(&AdapterConfig::from_url("http://localhost:8080")?).await?;
//! let books = Arc::new(RecordKind::new("Book").attribute("title", DataType::String).attribute("year", DataType::Integer));
//!
//! let mut records = vec![Record::new(books.clone()).with("title", "Dune").with("year", 1965)];
//! adapter.create(&mut records).await?;
//!
//! let recent = adapter.read_many(&Query::new(books).filter(Operator::Gt, "year", 1960)).await?;
//! ```

pub mod adapter;
pub mod config;
pub mod core;
pub mod inflection;
pub mod mapper;
pub mod query;
pub mod registry;
pub mod transport;

pub use adapter::{Changes, DataAdapter, PersevereAdapter, Target};
pub use config::AdapterConfig;
pub use crate::core::{AdapterError, Attribute, DataType, Record, RecordId, RecordKind, Result, Value};
pub use query::{Condition, Operator, Query};
pub use registry::SchemaRegistry;
pub use transport::{HttpTransport, MemoryStore, Response, Transport};
