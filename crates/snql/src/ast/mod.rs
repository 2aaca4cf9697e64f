//! AST types for MQL and SnQL
//!
//! Split into:
//! - `surface`: What the MQL parser produces (one node per grammar production)
//! - `expr`: Plain SnQL building blocks (columns, functions, conditions)
//! - `core`: Metrics nodes the printers consume (Metric, Timeseries, Formula)

pub mod core;
pub mod expr;
pub mod surface;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use thiserror::Error;

/// Construction-time validation failure raised by a node's own `validate()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("{0}")]
    Column(String),
    #[error("{0}")]
    Function(String),
    #[error("{0}")]
    Condition(String),
    #[error("{0}")]
    Literal(String),
    #[error("{0}")]
    Metric(String),
    #[error("{0}")]
    Timeseries(String),
    #[error("{0}")]
    Formula(String),
    #[error("{0}")]
    Rollup(String),
    #[error("{0}")]
    Scope(String),
}

// Shared literal type used by conditions, aggregate params and SnQL output

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Array(Vec<Scalar>),
    Tuple(Vec<Scalar>),
}

impl Scalar {
    /// Literal kinds that may appear as curried aggregate parameters.
    pub fn is_parameter_literal(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_) | Scalar::String(_))
    }

    fn family(&self) -> Option<&'static str> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some("bool"),
            Scalar::Int(_) | Scalar::Float(_) => Some("number"),
            Scalar::String(_) => Some("string"),
            Scalar::Date(_) => Some("date"),
            Scalar::DateTime(_) => Some("datetime"),
            Scalar::Array(_) => Some("array"),
            Scalar::Tuple(_) => Some("tuple"),
        }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        match self {
            Scalar::Array(items) => {
                let mut family = None;
                for item in items {
                    item.validate()?;
                    let Some(current) = item.family() else {
                        continue;
                    };
                    match family {
                        None => family = Some(current),
                        Some(seen) if seen != current => {
                            return Err(ExpressionError::Literal(
                                "arrays must have the same data type or None".to_string(),
                            ));
                        }
                        Some(_) => {}
                    }
                }
                Ok(())
            }
            Scalar::Tuple(items) => items.iter().try_for_each(Scalar::validate),
            Scalar::Float(n) if !n.is_finite() => Err(ExpressionError::Literal(format!(
                "{n} is not a representable number"
            ))),
            _ => Ok(()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Int(n.into())
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(Scalar::Float(n as f64), Scalar::Int)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Float(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Date(d)
    }
}

impl From<DateTime<FixedOffset>> for Scalar {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Scalar::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(dt: DateTime<Utc>) -> Self {
        Scalar::DateTime(dt.fixed_offset())
    }
}

impl From<Vec<Scalar>> for Scalar {
    fn from(items: Vec<Scalar>) -> Self {
        Scalar::Array(items)
    }
}

impl From<Vec<&str>> for Scalar {
    fn from(items: Vec<&str>) -> Self {
        Scalar::Array(items.into_iter().map(Scalar::from).collect())
    }
}

impl From<Vec<String>> for Scalar {
    fn from(items: Vec<String>) -> Self {
        Scalar::Array(items.into_iter().map(Scalar::String).collect())
    }
}

impl From<Vec<i64>> for Scalar {
    fn from(items: Vec<i64>) -> Self {
        Scalar::Array(items.into_iter().map(Scalar::Int).collect())
    }
}
