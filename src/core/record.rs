use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use crate::core::{RecordKind, Value};

/// Store-assigned record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Text(String),
    Integer(i64),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// A typed instance of a [`RecordKind`].
///
/// The identifier stays unset until the store assigns one on create; once
/// set it is never replaced.
#[derive(Debug, Clone)]
pub struct Record {
    kind: Arc<RecordKind>,
    id: Option<RecordId>,
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new(kind: Arc<RecordKind>) -> Self {
        Self {
            kind,
            id: None,
            values: HashMap::new(),
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn kind(&self) -> &Arc<RecordKind> {
        &self.kind
    }

    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Assign the store identifier. Returns false (and keeps the current
    /// one) when the record already has an identifier.
    pub(crate) fn assign_id(&mut self, id: RecordId) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    #[test]
    fn test_identifier_is_assigned_once() {
        let kind = Arc::new(RecordKind::new("Book").attribute("title", DataType::String));
        let mut record = Record::new(kind).with("title", "Dune");

        assert!(record.is_new());
        assert!(record.assign_id(RecordId::from("1")));
        assert!(!record.assign_id(RecordId::from("2")));
        assert_eq!(record.id(), Some(&RecordId::Text("1".to_string())));
        assert_eq!(record.get("title"), Some(&Value::from("Dune")));
    }
}
