//! Filter string translation
//!
//! Turns a query's conditions into the store's query-string filter:
//! `?title='Dune'&year>1999`. Terms keep the condition order; no
//! reordering and no deduplication.

use log::debug;
use crate::core::{AdapterError, Result, Value};
use super::Condition;
use super::Operator;

/// Builder for filter strings
#[derive(Debug, Default)]
pub struct FilterBuilder {
    terms: Vec<String>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition. Conditions without an attribute or a value are
    /// unconstrained and add nothing.
    pub fn condition(mut self, condition: &Condition) -> Result<Self> {
        if let Some(term) = encode_term(condition)? {
            self.terms.push(term);
        }
        Ok(self)
    }

    pub fn conditions<'a>(
        self,
        conditions: impl IntoIterator<Item = &'a Condition>,
    ) -> Result<Self> {
        conditions.into_iter().try_fold(self, |builder, c| builder.condition(c))
    }

    pub fn build(self) -> String {
        if self.terms.is_empty() {
            return String::new();
        }
        format!("?{}", self.terms.join("&"))
    }
}

/// Translate conditions into a filter string (empty when nothing constrains).
pub fn translate(conditions: &[Condition]) -> Result<String> {
    Ok(FilterBuilder::new().conditions(conditions)?.build())
}

fn encode_term(condition: &Condition) -> Result<Option<String>> {
    let (Some(attribute), Some(value)) = (&condition.attribute, &condition.value) else {
        debug!("skipping unconstrained {} condition", condition.operator);
        return Ok(None);
    };

    let token = condition.operator.token()?;
    let value = value.cast(&attribute.data_type)?;

    let encoded = match condition.operator {
        Operator::Like => format!("'*{}*'", escape_quotes(&value.to_string())),
        _ => format_value(&value),
    };

    Ok(Some(format!("{}{}{}", attribute.field(), token, encoded)))
}

/// Render a coerced value: strings and temporal values quoted, the rest in
/// canonical form.
fn format_value(value: &Value) -> String {
    match value {
        Value::Text(_) | Value::DateTime(_) | Value::Date(_) => {
            format!("'{}'", escape_quotes(&value.to_string()))
        }
        other => other.to_string(),
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// One `<field><op><value>` term read back from a filter string.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm {
    pub field: String,
    pub operator: Operator,
    /// Quoted literals come back as text (without the `*` wildcards for
    /// `~`); bare literals as null, boolean, integer or float when they
    /// read as one, text otherwise.
    pub value: Value,
}

/// Parse a filter string (with or without the leading `?`).
pub fn parse(filter: &str) -> Result<Vec<FilterTerm>> {
    let filter = filter.strip_prefix('?').unwrap_or(filter);
    split_terms(filter)
        .into_iter()
        .filter(|term| !term.is_empty())
        .map(parse_term)
        .collect()
}

fn split_terms(filter: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (idx, c) in filter.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '\'' => in_quotes = !in_quotes,
            '&' if !in_quotes => {
                terms.push(&filter[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    terms.push(&filter[start..]);
    terms
}

fn parse_term(term: &str) -> Result<FilterTerm> {
    let op_start = term
        .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~'))
        .filter(|idx| *idx > 0)
        .ok_or_else(|| AdapterError::Decode(format!("malformed filter term '{}'", term)))?;
    let (field, rest) = term.split_at(op_start);

    let token_len = match rest.get(..2) {
        Some("<=" | "=>" | "!=") => 2,
        _ => 1,
    };
    let (token, literal) = rest.split_at(token_len);
    let operator = Operator::from_token(token)?;

    let mut value = parse_literal(literal)?;
    if operator == Operator::Like {
        if let Value::Text(s) = &value {
            value = Value::Text(s.trim_matches('*').to_string());
        }
    }

    Ok(FilterTerm {
        field: field.to_string(),
        operator,
        value,
    })
}

fn parse_literal(literal: &str) -> Result<Value> {
    if let Some(quoted) = literal.strip_prefix('\'') {
        let inner = quoted
            .strip_suffix('\'')
            .ok_or_else(|| AdapterError::Decode(format!("unterminated string {}", literal)))?;
        return Ok(Value::Text(unescape_quotes(inner)));
    }

    Ok(match literal {
        "null" => Value::Null,
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => {
            if let Ok(i) = literal.parse::<i64>() {
                Value::Integer(i)
            } else if let Ok(f) = literal.parse::<f64>() {
                Value::Float(f)
            } else {
                Value::Text(literal.to_string())
            }
        }
    })
}

fn unescape_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attribute, DataType};

    fn title() -> Attribute {
        Attribute::new("title", DataType::String)
    }

    fn year() -> Attribute {
        Attribute::new("year", DataType::Integer)
    }

    #[test]
    fn test_single_condition_per_operator() {
        let cases = [
            (Operator::Eql, "year=1999"),
            (Operator::Lt, "year<1999"),
            (Operator::Gt, "year>1999"),
            (Operator::Lte, "year<=1999"),
            (Operator::Gte, "year=>1999"),
            (Operator::Not, "year!=1999"),
        ];
        for (op, expected) in cases {
            let filter = translate(&[Condition::new(op, year(), 1999)]).unwrap();
            assert_eq!(filter, format!("?{}", expected));
        }
    }

    #[test]
    fn test_string_values_are_quoted() {
        let filter = translate(&[Condition::new(Operator::Not, title(), "Dune")]).unwrap();
        assert_eq!(filter, "?title!='Dune'");
    }

    #[test]
    fn test_like_wraps_value_in_wildcards() {
        let filter = translate(&[Condition::new(Operator::Like, title(), "World")]).unwrap();
        assert_eq!(filter, "?title~'*World*'");
    }

    #[test]
    fn test_empty_conditions_yield_empty_filter() {
        assert_eq!(translate(&[]).unwrap(), "");
    }

    #[test]
    fn test_terms_keep_condition_order() {
        let filter = translate(&[
            Condition::new(Operator::Eql, title(), "Hello, World!"),
            Condition::new(Operator::Gt, year(), 1999),
        ])
        .unwrap();
        assert_eq!(filter, "?title='Hello, World!'&year>1999");
    }

    #[test]
    fn test_value_is_coerced_to_attribute_type() {
        let filter = translate(&[
            Condition::new(Operator::Eql, year(), "2001"),
            Condition::new(Operator::Eql, title(), 2001),
        ])
        .unwrap();
        assert_eq!(filter, "?year=2001&title='2001'");
    }

    #[test]
    fn test_uncoercible_value_is_an_error() {
        let err = translate(&[Condition::new(Operator::Eql, year(), "soon")]).unwrap_err();
        assert!(matches!(err, AdapterError::TypeCoercion(_)));
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        let err = translate(&[Condition::new(Operator::In, year(), 1)]).unwrap_err();
        assert_eq!(err, AdapterError::UnknownOperator("in".to_string()));
    }

    #[test]
    fn test_unconstrained_conditions_are_skipped() {
        let filter = translate(&[
            Condition {
                operator: Operator::Eql,
                attribute: None,
                value: Some(Value::from("x")),
            },
            Condition {
                operator: Operator::Gt,
                attribute: Some(year()),
                value: None,
            },
            Condition::new(Operator::Lt, year(), 2000),
        ])
        .unwrap();
        assert_eq!(filter, "?year<2000");
    }

    #[test]
    fn test_quotes_and_field_names() {
        let created = Attribute::new("created_at", DataType::Date).with_field("createdAt");
        let filter = translate(&[
            Condition::new(Operator::Eql, title(), "O'Reilly"),
            Condition::new(Operator::Gte, created, "2008-06-08"),
        ])
        .unwrap();
        assert_eq!(filter, "?title='O\\'Reilly'&createdAt=>'2008-06-08'");
    }

    #[test]
    fn test_parse_filter_terms() {
        let terms = parse("?title='Hello, World! & co'&year=>1999&title~'*Dune*'&done=false").unwrap();

        assert_eq!(terms.len(), 4);
        assert_eq!(terms[0].field, "title");
        assert_eq!(terms[0].value, Value::from("Hello, World! & co"));
        assert_eq!(terms[1].operator, Operator::Gte);
        assert_eq!(terms[1].value, Value::Integer(1999));
        assert_eq!(terms[2].operator, Operator::Like);
        assert_eq!(terms[2].value, Value::from("Dune"));
        assert_eq!(terms[3].value, Value::Boolean(false));
    }

    #[test]
    fn test_parse_reads_back_translated_filter() {
        let filter = translate(&[
            Condition::new(Operator::Not, title(), "O'Reilly"),
            Condition::new(Operator::Lte, year(), 2000),
        ])
        .unwrap();
        let terms = parse(&filter).unwrap();

        assert_eq!(terms[0].operator, Operator::Not);
        assert_eq!(terms[0].value, Value::from("O'Reilly"));
        assert_eq!(terms[1].operator, Operator::Lte);
        assert_eq!(parse("").unwrap(), vec![]);
    }

    #[test]
    fn test_parse_rejects_malformed_terms() {
        assert!(matches!(parse("?title"), Err(AdapterError::Decode(_))));
        assert!(matches!(parse("?=1"), Err(AdapterError::Decode(_))));
        assert!(matches!(parse("?title='open"), Err(AdapterError::Decode(_))));
    }
}
