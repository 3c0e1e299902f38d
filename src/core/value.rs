use std::fmt;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use crate::core::{AdapterError, DataType, Result};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::DateTime(_) => "DATETIME",
            Self::Date(_) => "DATE",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Cast the value to `target`, the way a declared attribute type
    /// accepts loosely typed input (a year given as `"1999"`, a flag given
    /// as `1`). NULL casts to NULL for every type.
    pub fn cast(&self, target: &DataType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }

        match target {
            DataType::String | DataType::Text => Ok(Value::Text(self.to_string())),

            DataType::Integer => match self {
                Self::Integer(i) => Ok(Self::Integer(*i)),
                Self::Float(f)
                    if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
                {
                    Ok(Self::Integer(*f as i64))
                }
                Self::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Self::Integer)
                    .map_err(|_| self.mismatch(target)),
                _ => Err(self.mismatch(target)),
            },

            DataType::Float => match self {
                Self::Float(f) => Ok(Self::Float(*f)),
                Self::Integer(i) => Ok(Self::Float(*i as f64)),
                Self::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Self::Float)
                    .map_err(|_| self.mismatch(target)),
                _ => Err(self.mismatch(target)),
            },

            DataType::Boolean => match self {
                Self::Boolean(b) => Ok(Self::Boolean(*b)),
                Self::Integer(0) => Ok(Self::Boolean(false)),
                Self::Integer(1) => Ok(Self::Boolean(true)),
                Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Ok(Self::Boolean(true)),
                    "false" | "f" | "0" => Ok(Self::Boolean(false)),
                    _ => Err(self.mismatch(target)),
                },
                _ => Err(self.mismatch(target)),
            },

            DataType::DateTime => match self {
                Self::DateTime(dt) => Ok(Self::DateTime(*dt)),
                Self::Date(d) => Ok(Self::DateTime(d.and_time(chrono::NaiveTime::MIN).and_utc())),
                Self::Text(s) => parse_datetime(s)
                    .map(Self::DateTime)
                    .ok_or_else(|| self.mismatch(target)),
                _ => Err(self.mismatch(target)),
            },

            DataType::Date => match self {
                Self::Date(d) => Ok(Self::Date(*d)),
                Self::DateTime(dt) => Ok(Self::Date(dt.date_naive())),
                Self::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map(Self::Date)
                    .map_err(|_| self.mismatch(target)),
                _ => Err(self.mismatch(target)),
            },
        }
    }

    fn mismatch(&self, target: &DataType) -> AdapterError {
        AdapterError::TypeCoercion(format!(
            "cannot cast {} value '{}' to {}",
            self.type_name(),
            self,
            target
        ))
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Zone-less timestamps are taken as UTC
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_text_to_integer() {
        let value = Value::from("1999").cast(&DataType::Integer).unwrap();
        assert_eq!(value, Value::Integer(1999));

        let err = Value::from("nineteen").cast(&DataType::Integer).unwrap_err();
        assert!(matches!(err, AdapterError::TypeCoercion(_)));
    }

    #[test]
    fn test_cast_to_text_uses_canonical_form() {
        assert_eq!(
            Value::Integer(42).cast(&DataType::String).unwrap(),
            Value::Text("42".to_string())
        );
        assert_eq!(
            Value::Boolean(true).cast(&DataType::Text).unwrap(),
            Value::Text("true".to_string())
        );
    }

    #[test]
    fn test_cast_float_to_integer_requires_whole_number() {
        assert_eq!(Value::Float(3.0).cast(&DataType::Integer).unwrap(), Value::Integer(3));
        assert!(Value::Float(3.5).cast(&DataType::Integer).is_err());
    }

    #[test]
    fn test_cast_float_out_of_integer_range() {
        // 2^63 is exactly i64::MAX as f64
        assert!(Value::Float(9_223_372_036_854_775_808.0).cast(&DataType::Integer).is_err());
        assert_eq!(
            Value::Float(-9_223_372_036_854_775_808.0).cast(&DataType::Integer).unwrap(),
            Value::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_cast_boolean_spellings() {
        assert_eq!(Value::from("t").cast(&DataType::Boolean).unwrap(), Value::Boolean(true));
        assert_eq!(Value::Integer(0).cast(&DataType::Boolean).unwrap(), Value::Boolean(false));
        assert!(Value::Integer(7).cast(&DataType::Boolean).is_err());
    }

    #[test]
    fn test_cast_datetime_from_text() {
        let value = Value::from("2008-06-08T17:03:07Z").cast(&DataType::DateTime).unwrap();
        assert_eq!(value.to_string(), "2008-06-08T17:03:07Z");

        let naive = Value::from("2008-06-08 17:03:07").cast(&DataType::DateTime).unwrap();
        assert_eq!(naive, value);

        let date = value.cast(&DataType::Date).unwrap();
        assert_eq!(date.to_string(), "2008-06-08");
    }

    #[test]
    fn test_null_casts_to_null() {
        for target in [DataType::Integer, DataType::Boolean, DataType::Date] {
            assert_eq!(Value::Null.cast(&target).unwrap(), Value::Null);
        }
    }
}
