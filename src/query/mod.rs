//! Declarative queries
//!
//! A [`Query`] names a record kind, the conditions that constrain it and the
//! attributes to project. [`filter`] turns the conditions into the store's
//! filter string.

pub mod filter;
mod operator;

use std::sync::Arc;
use crate::core::{AdapterError, Attribute, RecordKind, Result, Value};

pub use filter::{FilterBuilder, FilterTerm, parse as parse_filter, translate};
pub use operator::Operator;

/// `(operator, attribute, value)`. A condition missing its attribute or its
/// value leaves the query unconstrained.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub operator: Operator,
    pub attribute: Option<Attribute>,
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(operator: Operator, attribute: Attribute, value: impl Into<Value>) -> Self {
        Self {
            operator,
            attribute: Some(attribute),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Query {
    kind: Arc<RecordKind>,
    conditions: Vec<Condition>,
    fields: Vec<Attribute>,
    /// First attribute name `filter` could not resolve.
    invalid: Option<AdapterError>,
}

impl Query {
    /// Query over every record of `kind`, projecting all declared attributes.
    pub fn new(kind: Arc<RecordKind>) -> Self {
        let fields = kind.attributes().to_vec();
        Self {
            kind,
            conditions: Vec::new(),
            fields,
            invalid: None,
        }
    }

    /// Constrain `name` with `operator`. A name the kind does not declare
    /// makes the query invalid: [`Query::path`] then fails with
    /// [`AdapterError::UnknownAttribute`].
    pub fn filter(mut self, operator: Operator, name: &str, value: impl Into<Value>) -> Self {
        match self.kind.get_attribute(name).cloned() {
            Some(attribute) => self.conditions.push(Condition::new(operator, attribute, value)),
            None if self.invalid.is_none() => {
                self.invalid = Some(AdapterError::UnknownAttribute {
                    kind: self.kind.name().to_string(),
                    attribute: name.to_string(),
                });
            }
            None => {}
        }
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Project only the named attributes. Unknown names are ignored.
    pub fn fields(mut self, names: &[&str]) -> Self {
        self.fields = names
            .iter()
            .filter_map(|name| self.kind.get_attribute(name).cloned())
            .collect();
        self
    }

    pub fn kind(&self) -> &Arc<RecordKind> {
        &self.kind
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn projection(&self) -> &[Attribute] {
        &self.fields
    }

    /// Request path for this query: `/<CollectionName>/<filter>`.
    pub fn path(&self) -> Result<String> {
        if let Some(err) = &self.invalid {
            return Err(err.clone());
        }
        Ok(format!("{}{}", self.kind.collection_path(), translate(&self.conditions)?))
    }
}
