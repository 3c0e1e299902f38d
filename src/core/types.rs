use std::fmt;
use std::str::FromStr;
use crate::core::AdapterError;
use crate::inflection;

/// Semantic type of a record attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Date,
}

impl DataType {
    /// Types whose values travel as quoted strings in a filter.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Text)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::String => "String",
            Self::Text => "Text",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Date => "Date",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DataType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "text" => Ok(Self::Text),
            "integer" | "int" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" | "bool" => Ok(Self::Boolean),
            "datetime" => Ok(Self::DateTime),
            "date" => Ok(Self::Date),
            other => Err(AdapterError::Config(format!("unknown attribute type '{}'", other))),
        }
    }
}

/// Attribute descriptor: a declared name, the wire field it maps to and its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
    field: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            field: None,
        }
    }

    /// Store the attribute under a different field name on the wire.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

/// Metadata for one record type: its name, key and declared attributes.
///
/// The collection name is derived once from the kind's name (classified,
/// then pluralized) and is what every request path is built from.
#[derive(Debug, Clone)]
pub struct RecordKind {
    name: String,
    collection: String,
    key: Attribute,
    attributes: Vec<Attribute>,
}

impl RecordKind {
    /// New kind with the store's default string key `id`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let collection = inflection::collection_name(&name);
        Self {
            name,
            collection,
            key: Attribute::new("id", DataType::String),
            attributes: Vec::new(),
        }
    }

    pub fn key(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.key = Attribute::new(name, data_type);
        self
    }

    pub fn attribute(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.with_attribute(Attribute::new(name, data_type))
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Path of the collection, `/<CollectionName>/`.
    pub fn collection_path(&self) -> String {
        format!("/{}/", self.collection)
    }

    pub fn key_attribute(&self) -> &Attribute {
        &self.key
    }

    /// Declared non-key attributes, in declaration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        if self.key.name == name {
            return Some(&self.key);
        }
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_builder() {
        let kind = RecordKind::new("book")
            .attribute("title", DataType::String)
            .attribute("year", DataType::Integer);

        assert_eq!(kind.collection_name(), "Books");
        assert_eq!(kind.collection_path(), "/Books/");
        assert_eq!(kind.key_attribute().name, "id");
        assert_eq!(kind.attributes().len(), 2);
        assert_eq!(kind.get_attribute("year").unwrap().data_type, DataType::Integer);
        assert!(kind.get_attribute("isbn").is_none());
    }

    #[test]
    fn test_attribute_field_override() {
        let attr = Attribute::new("created_at", DataType::DateTime).with_field("createdAt");
        assert_eq!(attr.field(), "createdAt");
        assert_eq!(Attribute::new("title", DataType::String).field(), "title");

        let kind = RecordKind::new("Book").with_attribute(attr);
        assert_eq!(kind.get_attribute("created_at").unwrap().field(), "createdAt");
    }

    #[test]
    fn test_parse_data_type() {
        assert_eq!("Integer".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("bool".parse::<DataType>().unwrap(), DataType::Boolean);
        assert!("blob".parse::<DataType>().is_err());
    }
}
