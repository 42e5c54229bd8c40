//! Built-in cell transforms.
//!
//! Operations run after the column's reducer, in declaration order.
//! Text operations accept strings, numbers and booleans (stringified)
//! and pass other values through untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::col::TransformFn;
use crate::error::BoxError;

static YEAR: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d{4}").ok());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Remove leading and trailing whitespace
    Trim,

    /// Convert to uppercase
    Uppercase,

    /// Convert to lowercase
    Lowercase,

    /// Replace using regex pattern
    Replace {
        pattern: String,
        #[serde(default)]
        value: String,
    },

    /// Pad string at start to reach target length
    PadStart {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Ensure string starts with given prefix
    EnsurePrefix { value: String },

    /// Ensure string ends with given suffix
    EnsureSuffix { value: String },

    /// Map values using a lookup table
    Map {
        mapping: HashMap<String, String>,
        #[serde(default)]
        case_insensitive: bool,
        /// Replacement for unmapped values; unmapped values are kept when absent
        #[serde(default)]
        default_unmapped: Option<String>,
    },

    /// Characters `start..start+length`
    Substring {
        start: usize,
        #[serde(default)]
        length: Option<usize>,
    },

    /// Remove all non-digit characters
    DigitsOnly,

    /// Render any value as text (null stays null)
    ToText,

    /// Parse text as an integer, then as a float; null when neither
    ToNumber,

    /// Convert to boolean
    ToBoolean {
        #[serde(default = "default_true_values")]
        true_values: Vec<String>,
    },

    /// Round a number to `digits` decimals
    Round {
        #[serde(default)]
        digits: u32,
    },

    /// First 4-digit run, as a number
    ExtractYear,
}

fn default_pad_char() -> String {
    "0".to_string()
}

fn default_true_values() -> Vec<String> {
    ["true", "1", "yes", "y", "x"].iter().map(|s| s.to_string()).collect()
}

impl Operation {
    /// Apply this operation to a value.
    pub fn apply(&self, value: &Value) -> Result<Value, BoxError> {
        let result = match self {
            Operation::Trim => map_text(value, |s| s.trim().to_string()),
            Operation::Uppercase => map_text(value, |s| s.to_uppercase()),
            Operation::Lowercase => map_text(value, |s| s.to_lowercase()),
            Operation::Replace { pattern, value: replacement } => {
                replace(&Regex::new(pattern)?, value, replacement)
            }
            Operation::PadStart { length, char } => {
                let pad = char.chars().next().unwrap_or('0');
                map_text(value, |s| {
                    let missing = length.saturating_sub(s.chars().count());
                    std::iter::repeat(pad).take(missing).chain(s.chars()).collect()
                })
            }
            Operation::EnsurePrefix { value: prefix } => map_text(value, |s| {
                if s.starts_with(prefix.as_str()) {
                    s.to_string()
                } else {
                    format!("{}{}", prefix, s)
                }
            }),
            Operation::EnsureSuffix { value: suffix } => map_text(value, |s| {
                if s.ends_with(suffix.as_str()) {
                    s.to_string()
                } else {
                    format!("{}{}", s, suffix)
                }
            }),
            Operation::Map { mapping, case_insensitive, default_unmapped } => {
                map_text(value, |s| lookup(mapping, s, *case_insensitive, default_unmapped.as_deref()))
            }
            Operation::Substring { start, length } => map_text(value, |s| {
                let chars = s.chars().skip(*start);
                match length {
                    Some(n) => chars.take(*n).collect(),
                    None => chars.collect(),
                }
            }),
            Operation::DigitsOnly => map_text(value, |s| s.chars().filter(|c| c.is_ascii_digit()).collect()),
            Operation::ToText => match value {
                Value::Null | Value::String(_) => value.clone(),
                Value::Number(_) | Value::Bool(_) => Value::String(text(value).unwrap_or_default()),
                other => Value::String(serde_json::to_string(other)?),
            },
            Operation::ToNumber => to_number(value),
            Operation::ToBoolean { true_values } => match value {
                Value::Bool(_) => value.clone(),
                Value::Null => Value::Bool(false),
                _ => {
                    let s = text(value).unwrap_or_default();
                    let s = s.trim();
                    Value::Bool(true_values.iter().any(|tv| tv.eq_ignore_ascii_case(s)))
                }
            },
            Operation::Round { digits } => round(value, *digits)?,
            Operation::ExtractYear => extract_year(value),
        };
        Ok(result)
    }

    /// Turn this operation into a transform, compiling its pattern once.
    ///
    /// An invalid `replace` pattern fails on every value it is applied to.
    pub fn into_fn(self) -> TransformFn {
        match self {
            Operation::Replace { pattern, value: replacement } => match Regex::new(&pattern) {
                Ok(re) => Arc::new(move |value: Value| -> Result<Value, BoxError> {
                    Ok(replace(&re, &value, &replacement))
                }),
                Err(err) => Arc::new(move |_: Value| -> Result<Value, BoxError> { Err(err.clone().into()) }),
            },
            op => Arc::new(move |value: Value| -> Result<Value, BoxError> { op.apply(&value) }),
        }
    }
}

fn replace(re: &Regex, value: &Value, replacement: &str) -> Value {
    map_text(value, |s| re.replace_all(s, replacement).into_owned())
}

/// Textual form of scalar values.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match text(value) {
        Some(s) => Value::String(f(&s)),
        None => value.clone(),
    }
}

fn lookup(
    mapping: &HashMap<String, String>,
    key: &str,
    case_insensitive: bool,
    default_unmapped: Option<&str>,
) -> String {
    let found = if case_insensitive {
        mapping
            .iter()
            .find(|(k, _)| k.to_lowercase() == key.to_lowercase())
            .map(|(_, v)| v)
    } else {
        mapping.get(key)
    };

    match (found, default_unmapped) {
        (Some(v), _) => v.clone(),
        (None, Some(d)) => d.to_string(),
        (None, None) => key.to_string(),
    }
}

fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::Bool(b) => Value::from(i64::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Value::from(n)
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        _ => Value::Null,
    }
}

fn round(value: &Value, digits: u32) -> Result<Value, BoxError> {
    let Value::Number(n) = value else {
        return Ok(value.clone());
    };
    if n.is_i64() || n.is_u64() {
        return Ok(value.clone());
    }

    let factor = 10f64.powi(i32::try_from(digits)?);
    let rounded = (n.as_f64().unwrap_or_default() * factor).round() / factor;
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if digits == 0 && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        return Ok(Value::from(rounded as i64));
    }
    Number::from_f64(rounded)
        .map(Value::Number)
        .ok_or_else(|| format!("cannot round {}", n).into())
}

fn extract_year(value: &Value) -> Value {
    let Some(s) = text(value) else {
        return Value::Null;
    };
    (*YEAR)
        .as_ref()
        .and_then(|re| re.find(&s))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}

/// Get a description of all available reducers and operations
pub fn operations_description() -> String {
    r#"Reducers (column "reduce", default "last"):

| Reducer | Description | Parameters |
|---------|-------------|------------|
| last | Keep the last key's value | - |
| first | Keep the first key's value | - |
| coalesce | First non-null value | - |
| sum | Numeric sum (integers stay integers, numeric text accepted) | - |
| join | Join string values | separator (default " ") |
| min | Smallest number | - |
| max | Largest number | - |
| list | All values as an array | - |

Operations (column "operations", applied in order):

| Operation | Description | Parameters |
|-----------|-------------|------------|
| trim | Remove leading/trailing whitespace | - |
| uppercase | Convert to uppercase | - |
| lowercase | Convert to lowercase | - |
| replace | Regex pattern replacement | pattern: regex, value: replacement |
| pad_start | Pad string at start | length: target length, char: pad character (default "0") |
| ensure_prefix | Add prefix if not present | value: prefix string |
| ensure_suffix | Add suffix if not present | value: suffix string |
| map | Map values using lookup table | mapping: {source: target}, case_insensitive: bool, default_unmapped |
| substring | Extract substring | start: start index, length: optional length |
| digits_only | Keep only digits | - |
| to_text | Render value as text | - |
| to_number | Parse integer or float | - |
| to_boolean | Convert to boolean | true_values: list of truthy strings |
| round | Round a number | digits (default 0) |
| extract_year | Extract 4-digit year from date | - |

Example column in JSON:
{
  "header": "Member",
  "keys": ["first_name", "last_name"],
  "reduce": {"type": "join", "separator": " "},
  "operations": [{"type": "trim"}, {"type": "uppercase"}],
  "default": ""
}"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trim() {
        let op = Operation::Trim;
        assert_eq!(op.apply(&json!("  hello  ")).unwrap(), json!("hello"));
        assert_eq!(op.apply(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_replace() {
        let op = Operation::Replace { pattern: "[-. ]".into(), value: String::new() };
        assert_eq!(op.apply(&json!("T-123.456 7")).unwrap(), json!("T1234567"));
    }

    #[test]
    fn test_replace_invalid_pattern_is_error() {
        let op = Operation::Replace { pattern: "(".into(), value: String::new() };
        assert!(op.apply(&json!("x")).is_err());

        let transform = op.into_fn();
        assert!(transform(json!("x")).is_err());
        assert!(transform(json!("y")).is_err());
    }

    #[test]
    fn test_into_fn_reuses_compiled_pattern() {
        let transform = Operation::Replace { pattern: r"\s+".into(), value: "_".into() }.into_fn();
        assert_eq!(transform(json!("a  b")).unwrap(), json!("a_b"));
        assert_eq!(transform(json!("c d e")).unwrap(), json!("c_d_e"));
        assert_eq!(transform(Value::Null).unwrap(), Value::Null);

        let upper = Operation::Uppercase.into_fn();
        assert_eq!(upper(json!("abc")).unwrap(), json!("ABC"));
    }

    #[test]
    fn test_map() {
        let mapping = HashMap::from([
            ("M".to_string(), "Member".to_string()),
            ("G".to_string(), "Guest".to_string()),
        ]);

        let op = Operation::Map { mapping: mapping.clone(), case_insensitive: true, default_unmapped: None };
        assert_eq!(op.apply(&json!("m")).unwrap(), json!("Member"));
        assert_eq!(op.apply(&json!("Unknown")).unwrap(), json!("Unknown"));

        let op_with_default = Operation::Map { mapping, case_insensitive: false, default_unmapped: Some("Other".into()) };
        assert_eq!(op_with_default.apply(&json!("m")).unwrap(), json!("Other"));
    }

    #[test]
    fn test_pad_and_affixes() {
        let op = Operation::PadStart { length: 5, char: "0".into() };
        assert_eq!(op.apply(&json!(42)).unwrap(), json!("00042"));

        let op = Operation::EnsurePrefix { value: "T".into() };
        assert_eq!(op.apply(&json!("123")).unwrap(), json!("T123"));
        assert_eq!(op.apply(&json!("T123")).unwrap(), json!("T123"));

        let op = Operation::EnsureSuffix { value: "%".into() };
        assert_eq!(op.apply(&json!(12)).unwrap(), json!("12%"));
    }

    #[test]
    fn test_substring_and_digits() {
        let op = Operation::Substring { start: 1, length: Some(3) };
        assert_eq!(op.apply(&json!("élan vital")).unwrap(), json!("lan"));
        assert_eq!(Operation::DigitsOnly.apply(&json!("+44 (0) 20")).unwrap(), json!("44020"));
    }

    #[test]
    fn test_to_number() {
        let op = Operation::ToNumber;
        assert_eq!(op.apply(&json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(op.apply(&json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(op.apply(&json!("n/a")).unwrap(), Value::Null);
    }

    #[test]
    fn test_to_text_and_boolean() {
        assert_eq!(Operation::ToText.apply(&json!(3)).unwrap(), json!("3"));
        assert_eq!(Operation::ToText.apply(&json!([1, 2])).unwrap(), json!("[1,2]"));

        let op = Operation::ToBoolean { true_values: default_true_values() };
        assert_eq!(op.apply(&json!("YES")).unwrap(), json!(true));
        assert_eq!(op.apply(&json!("no")).unwrap(), json!(false));
        assert_eq!(op.apply(&json!(1)).unwrap(), json!(true));
    }

    #[test]
    fn test_round() {
        assert_eq!(Operation::Round { digits: 2 }.apply(&json!(3.14159)).unwrap(), json!(3.14));
        assert_eq!(Operation::Round { digits: 0 }.apply(&json!(2.6)).unwrap(), json!(3));
        assert_eq!(Operation::Round { digits: 2 }.apply(&json!("x")).unwrap(), json!("x"));
    }

    #[test]
    fn test_round_out_of_integer_range_stays_float() {
        let round = Operation::Round { digits: 0 };
        assert_eq!(round.apply(&json!(1e20)).unwrap(), json!(1e20));
        assert_eq!(round.apply(&json!(-1e20)).unwrap(), json!(-1e20));
        assert_eq!(round.apply(&json!(-2.5)).unwrap(), json!(-3));
    }

    #[test]
    fn test_extract_year() {
        let op = Operation::ExtractYear;
        assert_eq!(op.apply(&json!("15/03/2024")).unwrap(), json!(2024));
        assert_eq!(op.apply(&json!("no date")).unwrap(), Value::Null);
    }

    #[test]
    fn test_deserialize_defaults() {
        let op: Operation = serde_json::from_value(json!({"type": "pad_start", "length": 4})).unwrap();
        assert_eq!(op, Operation::PadStart { length: 4, char: "0".into() });
    }
}
