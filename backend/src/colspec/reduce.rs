//! Built-in reducers.
//!
//! A reducer collapses the values looked up for a column's keys
//! (one per key, in key order) into a single cell value.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::sync::Arc;

use super::col::ReduceFn;
use crate::error::BoxError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reduction {
    /// Keep the last value
    #[default]
    Last,

    /// Keep the first value
    First,

    /// First non-null value
    Coalesce,

    /// Numeric sum
    Sum,

    /// Join strings
    Join {
        #[serde(default = "default_join_separator")]
        separator: String,
    },

    /// Smallest number
    Min,

    /// Largest number
    Max,

    /// Keep every value as a JSON array
    List,
}

fn default_join_separator() -> String {
    " ".to_string()
}

impl Reduction {
    pub fn apply(&self, mut values: Vec<Value>) -> Result<Value, BoxError> {
        match self {
            Reduction::Last => values.pop().ok_or_else(|| "no values to reduce".into()),
            Reduction::First => values.into_iter().next().ok_or_else(|| "no values to reduce".into()),
            Reduction::Coalesce => Ok(values.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null)),
            Reduction::Sum => sum(&values),
            Reduction::Join { separator } => join(&values, separator),
            Reduction::Min => extremum(&values, |candidate, best| candidate < best),
            Reduction::Max => extremum(&values, |candidate, best| candidate > best),
            Reduction::List => Ok(Value::Array(values)),
        }
    }

    pub fn into_fn(self) -> ReduceFn {
        Arc::new(move |values: Vec<Value>| self.apply(values))
    }
}

/// A number, or a string holding one (CSV cells are text).
fn as_number(value: &Value) -> Result<Number, BoxError> {
    let parsed = match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => parse_number(s.trim()),
        _ => None,
    };
    parsed.ok_or_else(|| format!("expected a number, got {}", value).into())
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(n) = s.parse::<i64>() {
        return Some(Number::from(n));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Integer sum when every input is an integer, float sum otherwise.
fn sum(values: &[Value]) -> Result<Value, BoxError> {
    let numbers = values.iter().map(as_number).collect::<Result<Vec<_>, _>>()?;

    let integers: Option<Vec<i64>> = numbers.iter().map(|n| n.as_i64()).collect();
    if let Some(integers) = integers {
        return integers
            .iter()
            .try_fold(0i64, |acc, n| acc.checked_add(*n))
            .map(Value::from)
            .ok_or_else(|| "integer overflow in sum".into());
    }

    let total: f64 = numbers.iter().filter_map(|n| n.as_f64()).sum();
    Number::from_f64(total)
        .map(Value::Number)
        .ok_or_else(|| format!("sum is not a finite number: {}", total).into())
}

fn join(values: &[Value], separator: &str) -> Result<Value, BoxError> {
    let parts = values
        .iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.as_str()),
            other => Err(BoxError::from(format!("expected a string, got {}", other))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(separator)))
}

fn extremum(values: &[Value], better: fn(f64, f64) -> bool) -> Result<Value, BoxError> {
    let mut best: Option<(Number, f64)> = None;
    for value in values {
        let number = as_number(value)?;
        let n = number.as_f64().unwrap_or(f64::NAN);
        match best {
            Some((_, current)) if !better(n, current) => {}
            _ => best = Some((number, n)),
        }
    }
    Ok(best.map(|(number, _)| Value::Number(number)).unwrap_or(Value::Null))
}
