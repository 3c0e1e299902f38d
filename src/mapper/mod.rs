//! Attribute Mapper
//!
//! Converts records to the store's JSON objects (outbound) and JSON objects
//! back to records (inbound), coercing every inbound field to the type its
//! attribute declares.

use chrono::SecondsFormat;
use serde_json::{Map, Value as JsonValue};
use crate::core::{AdapterError, Attribute, DataType, Record, RecordId, RecordKind, Result, Value};
use std::sync::Arc;

/// Payload for a record: every set attribute except the key.
pub fn to_payload(record: &Record) -> JsonValue {
    let mut obj = Map::new();
    for attribute in record.kind().attributes() {
        if let Some(value) = record.get(&attribute.name) {
            obj.insert(attribute.field().to_string(), value_to_json(value));
        }
    }
    JsonValue::Object(obj)
}

/// Build a record of `kind` from a wire object, reading only `projection`
/// (plus the key).
pub fn from_json(kind: &Arc<RecordKind>, json: &JsonValue, projection: &[Attribute]) -> Result<Record> {
    let mut record = Record::new(Arc::clone(kind));
    merge_attributes(&mut record, json, projection)?;
    Ok(record)
}

/// Apply a wire object onto an existing record: assigns the identifier if
/// the record has none and overwrites every declared attribute present in
/// the object.
pub fn merge_into(record: &mut Record, json: &JsonValue) -> Result<()> {
    let kind = Arc::clone(record.kind());
    merge_attributes(record, json, kind.attributes())
}

fn merge_attributes(record: &mut Record, json: &JsonValue, attributes: &[Attribute]) -> Result<()> {
    let obj = json
        .as_object()
        .ok_or_else(|| AdapterError::Decode(format!("expected JSON object, got {}", json)))?;

    let key = record.kind().key_attribute().clone();
    if let Some(id) = obj.get(key.field()) {
        if let Some(id) = decode_id(id, &key)? {
            record.assign_id(id);
        }
    }

    for attribute in attributes {
        let Some(raw) = obj.get(attribute.field()) else {
            continue;
        };
        let value = json_to_value(raw, &attribute.data_type).map_err(|err| {
            AdapterError::Decode(format!("field '{}': {}", attribute.field(), err))
        })?;
        record.set(&attribute.name, value);
    }

    Ok(())
}

/// Identifiers may arrive qualified (`"Books/3"`); only the last segment
/// is kept.
fn decode_id(raw: &JsonValue, key: &Attribute) -> Result<Option<RecordId>> {
    let raw = match raw {
        JsonValue::String(s) => JsonValue::String(s.rsplit('/').next().unwrap_or(s).to_string()),
        other => other.clone(),
    };

    let value = json_to_value(&raw, &key.data_type)
        .map_err(|err| AdapterError::Decode(format!("identifier: {}", err)))?;

    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(RecordId::Integer(i))),
        Value::Text(s) if !s.is_empty() => Ok(Some(RecordId::Text(s))),
        Value::Text(_) => Ok(None),
        other => Err(AdapterError::Decode(format!(
            "identifier of type {} is not supported",
            other.type_name()
        ))),
    }
}

/// Convert a JSON value to a typed value of `expected_type`.
pub fn json_to_value(json_value: &JsonValue, expected_type: &DataType) -> Result<Value> {
    let loose = match json_value {
        JsonValue::Null => return Ok(Value::Null),
        JsonValue::Bool(b) => Value::Boolean(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| AdapterError::TypeCoercion(format!("number {} out of range", n)))?,
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        // Nested documents only fit textual attributes
        JsonValue::Array(_) | JsonValue::Object(_) if expected_type.is_textual() => {
            return Ok(Value::Text(json_value.to_string()));
        }
        JsonValue::Array(_) | JsonValue::Object(_) => {
            return Err(AdapterError::TypeCoercion(format!(
                "cannot convert JSON {} to {}",
                json_value, expected_type
            )));
        }
    };

    loose.cast(expected_type)
}

/// Convert a typed value to its JSON representation.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::DateTime(dt) => JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn books() -> Arc<RecordKind> {
        Arc::new(
            RecordKind::new("Book")
                .attribute("title", DataType::String)
                .attribute("author", DataType::String)
                .attribute("year", DataType::Integer)
                .attribute("created_at", DataType::DateTime),
        )
    }

    #[test]
    fn test_payload_omits_identifier_and_unset_attributes() {
        let mut record = Record::new(books())
            .with("title", "Dune")
            .with("author", "Herbert");
        record.assign_id(RecordId::from("7"));

        assert_eq!(to_payload(&record), json!({"title": "Dune", "author": "Herbert"}));
    }

    #[test]
    fn test_inbound_coerces_declared_types() {
        let kind = books();
        let record = from_json(
            &kind,
            &json!({"id": "3", "title": "Dune", "year": "1965", "created_at": "2008-06-08T17:03:07Z"}),
            kind.attributes(),
        )
        .unwrap();

        assert_eq!(record.id(), Some(&RecordId::Text("3".to_string())));
        assert_eq!(record.get("year"), Some(&Value::Integer(1965)));
        assert!(matches!(record.get("created_at"), Some(Value::DateTime(_))));
        assert!(!record.is_set("author"));
    }

    #[test]
    fn test_inbound_number_into_string_attribute() {
        let kind = books();
        let record = from_json(&kind, &json!({"title": 1984}), kind.attributes()).unwrap();
        assert_eq!(record.get("title"), Some(&Value::from("1984")));
    }

    #[test]
    fn test_inbound_respects_projection() {
        let kind = books();
        let projection = vec![kind.get_attribute("title").unwrap().clone()];
        let record = from_json(&kind, &json!({"id": "1", "title": "Dune", "year": 1965}), &projection).unwrap();

        assert!(record.is_set("title"));
        assert!(!record.is_set("year"));
        assert!(record.id().is_some());
    }

    #[test]
    fn test_coercion_failure_is_a_decode_error() {
        let kind = books();
        let err = from_json(&kind, &json!({"year": "long ago"}), kind.attributes()).unwrap_err();
        assert!(matches!(err, AdapterError::Decode(msg) if msg.contains("year")));

        let err = from_json(&kind, &json!(["not", "an", "object"]), kind.attributes()).unwrap_err();
        assert!(matches!(err, AdapterError::Decode(_)));
    }

    #[test]
    fn test_qualified_and_integer_identifiers() {
        let kind = books();
        let record = from_json(&kind, &json!({"id": "Books/12"}), &[]).unwrap();
        assert_eq!(record.id(), Some(&RecordId::Text("12".to_string())));

        let numeric = Arc::new(RecordKind::new("Counter").key("id", DataType::Integer));
        let record = from_json(&numeric, &json!({"id": "Counters/5"}), &[]).unwrap();
        assert_eq!(record.id(), Some(&RecordId::Integer(5)));
    }

    #[test]
    fn test_merge_into_keeps_existing_values() {
        let mut record = Record::new(books()).with("title", "Dune").with("author", "Herbert");
        merge_into(&mut record, &json!({"id": "9", "created_at": "2008-06-08T17:03:07Z"})).unwrap();

        assert_eq!(record.id(), Some(&RecordId::Text("9".to_string())));
        assert_eq!(record.get("title"), Some(&Value::from("Dune")));
        assert!(record.is_set("created_at"));
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(&Value::Integer(42)), json!(42));
        assert_eq!(value_to_json(&Value::Float(f64::NAN)), JsonValue::Null);
        assert_eq!(value_to_json(&Value::Boolean(false)), json!(false));
    }
}
