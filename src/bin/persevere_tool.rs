use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use persevere_adapter::query::parse_filter;
use persevere_adapter::{
    AdapterConfig, Condition, DataAdapter, DataType, PersevereAdapter, Query, RecordKind, Transport,
    mapper,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "persevere-tool")]
#[command(about = "Developer tooling for the Persevere store adapter")]
struct Cli {
    /// Store URL
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the classes registered in the store
    Classes,
    /// Register a class for a collection
    Register { collection: String },
    /// Print the raw documents of a collection
    Get {
        collection: String,
        /// Raw filter, e.g. "year>1999&title~'*Dune*'"
        #[arg(long)]
        filter: Option<String>,
    },
    /// Query a record kind through the adapter
    Find {
        kind: String,
        /// Declared attribute, name:Type (repeatable)
        #[arg(long = "attr")]
        attributes: Vec<String>,
        /// Condition, e.g. "year>1999" (repeatable)
        #[arg(long = "where")]
        conditions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AdapterConfig::from_url(&cli.url)?.timeout(Duration::from_secs(cli.timeout_secs));
    let adapter = PersevereAdapter::from_config(&config)
        .await
        .with_context(|| format!("Failed to set up adapter for '{}'", cli.url))?;

    match cli.command {
        Command::Classes => list_classes(&adapter).await,
        Command::Register { collection } => register(&adapter, &collection).await,
        Command::Get { collection, filter } => get(&adapter, &collection, filter.as_deref()).await,
        Command::Find {
            kind,
            attributes,
            conditions,
        } => find(&adapter, &kind, &attributes, &conditions).await,
    }
}

async fn list_classes<T: Transport>(adapter: &PersevereAdapter<T>) -> Result<()> {
    if let Some(err) = adapter.registry().sync_error() {
        return Err(anyhow!("Failed to list classes: {}", err));
    }
    for name in adapter.registry().collections().await {
        println!("{}", name);
    }
    Ok(())
}

async fn register<T: Transport>(adapter: &PersevereAdapter<T>, collection: &str) -> Result<()> {
    let sent = adapter
        .registry()
        .ensure_registered(adapter.transport(), collection)
        .await?;
    if sent {
        println!("Registered class: {}", collection);
    } else {
        println!("Class already registered: {}", collection);
    }
    Ok(())
}

async fn get<T: Transport>(adapter: &PersevereAdapter<T>, collection: &str, filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(raw) if !raw.starts_with('?') => format!("?{}", raw),
        Some(raw) => raw.to_string(),
        None => String::new(),
    };
    let path = format!("/{}/{}", collection, filter);

    let response = adapter.transport().retrieve(&path).await?;
    if !response.is_ok() {
        return Err(anyhow!("GET {} returned {}: {}", path, response.status, response.body));
    }
    println!("{}", serde_json::to_string_pretty(&response.json()?)?);
    Ok(())
}

async fn find<T: Transport>(
    adapter: &PersevereAdapter<T>,
    kind_name: &str,
    attributes: &[String],
    conditions: &[String],
) -> Result<()> {
    let mut kind = RecordKind::new(kind_name);
    for (name, ty) in parse_attributes(attributes)? {
        kind = kind.attribute(name, ty);
    }
    let kind = Arc::new(kind);

    let mut query = Query::new(Arc::clone(&kind));
    for raw in conditions {
        for term in parse_filter(raw)? {
            let attribute = kind
                .get_attribute(&term.field)
                .cloned()
                .ok_or_else(|| anyhow!("'{}' is not a declared attribute of {}", term.field, kind_name))?;
            query = query.condition(Condition::new(term.operator, attribute, term.value));
        }
    }

    let records = adapter.read_many(&query).await?;
    let documents: Vec<JsonValue> = records
        .iter()
        .map(|record| {
            let mut doc = mapper::to_payload(record);
            if let (Some(obj), Some(id)) = (doc.as_object_mut(), record.id()) {
                obj.insert("id".to_string(), JsonValue::String(id.to_string()));
            }
            doc
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&documents)?);
    eprintln!("{} record(s) in {}", records.len(), kind.collection_name());
    Ok(())
}

fn parse_attributes(input: &[String]) -> Result<Vec<(String, DataType)>> {
    input
        .iter()
        .map(|part| {
            let (name, ty) = part
                .split_once(':')
                .ok_or_else(|| anyhow!("Invalid attribute '{}'. Expected format: name:Type", part))?;
            Ok((name.trim().to_string(), ty.trim().parse::<DataType>()?))
        })
        .collect()
}
