use std::fmt;
use std::str::FromStr;
use crate::core::{AdapterError, Result};

/// Comparison operators a query condition can carry.
///
/// `In` is accepted from callers but has no filter-syntax counterpart;
/// translating it yields [`AdapterError::UnknownOperator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eql,
    Lt,
    Gt,
    Lte,
    Gte,
    Not,
    Like,
    In,
}

impl Operator {
    /// Filter-syntax token for this operator.
    pub fn token(&self) -> Result<&'static str> {
        match self {
            Self::Eql => Ok("="),
            Self::Lt => Ok("<"),
            Self::Gt => Ok(">"),
            Self::Lte => Ok("<="),
            // The store spells greater-or-equal this way
            Self::Gte => Ok("=>"),
            Self::Not => Ok("!="),
            Self::Like => Ok("~"),
            Self::In => Err(AdapterError::UnknownOperator(self.name().to_string())),
        }
    }

    /// Operator for a filter-syntax token, the inverse of [`Operator::token`].
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "=" => Ok(Self::Eql),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Lte),
            "=>" => Ok(Self::Gte),
            "!=" => Ok(Self::Not),
            "~" => Ok(Self::Like),
            other => Err(AdapterError::UnknownOperator(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eql => "eql",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Gte => "gte",
            Self::Not => "not",
            Self::Like => "like",
            Self::In => "in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Operator {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eql" | "eq" => Ok(Self::Eql),
            "lt" => Ok(Self::Lt),
            "gt" => Ok(Self::Gt),
            "lte" => Ok(Self::Lte),
            "gte" => Ok(Self::Gte),
            "not" | "ne" => Ok(Self::Not),
            "like" => Ok(Self::Like),
            "in" => Ok(Self::In),
            other => Err(AdapterError::UnknownOperator(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tokens() {
        let expected = [
            (Operator::Eql, "="),
            (Operator::Lt, "<"),
            (Operator::Gt, ">"),
            (Operator::Lte, "<="),
            (Operator::Gte, "=>"),
            (Operator::Not, "!="),
            (Operator::Like, "~"),
        ];
        for (op, token) in expected {
            assert_eq!(op.token().unwrap(), token);
            assert_eq!(Operator::from_token(token).unwrap(), op);
        }
        assert!(Operator::from_token(">=").is_err());
    }

    #[test]
    fn test_in_has_no_token() {
        assert_eq!(
            Operator::In.token(),
            Err(AdapterError::UnknownOperator("in".to_string()))
        );
    }

    #[test]
    fn test_parse_operator_names() {
        assert_eq!("gte".parse::<Operator>().unwrap(), Operator::Gte);
        assert_eq!("ne".parse::<Operator>().unwrap(), Operator::Not);
        assert!(matches!(
            "between".parse::<Operator>(),
            Err(AdapterError::UnknownOperator(name)) if name == "between"
        ));
    }
}
