//! A single output column.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::operations::Operation;
use super::reduce::Reduction;
use super::spec::RowContext;
use crate::error::{BoxError, ColumnError, ColumnResult};

/// Separator between a relation name and the field reached through it
/// (`club__name` reads `name` on the related `club`).
pub const RELATED_SEPARATOR: &str = "__";

/// Collapses the looked-up values (one per key, in key order) into one value.
pub type ReduceFn = Arc<dyn Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync>;

/// Post-processes the reduced value.
pub type TransformFn = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// One spreadsheet column: a header, the input keys it reads,
/// and how those inputs become a single cell.
///
/// Without an explicit reducer the column keeps the *last* looked-up value.
/// This is what a single-key column wants, but a column declared with several
/// keys and no reducer silently drops all values but the last one.
#[derive(Clone)]
pub struct Col {
    header: String,
    keys: Vec<String>,
    reduce: ReduceFn,
    transform: TransformFn,
    default: Option<Value>,
    related: Vec<String>,
}

impl Col {
    /// Column reading the key named like its header.
    pub fn new(header: impl Into<String>) -> Self {
        Self::from_keys(header, std::iter::empty::<String>())
    }

    /// Column reading `keys` in order. An empty list falls back to the header.
    pub fn from_keys<I, K>(header: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let header = header.into();
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            keys.push(header.clone());
        }

        Self {
            header,
            keys,
            reduce: Reduction::Last.into_fn(),
            transform: Arc::new(identity),
            default: None,
            related: Vec::new(),
        }
    }

    /// Replace the reducer.
    pub fn with_reduce<F>(mut self, reduce: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.reduce = Arc::new(reduce);
        self
    }

    /// Replace the reducer with a built-in one.
    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduce = reduction.into_fn();
        self
    }

    /// Replace the transform.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.transform = Arc::new(transform);
        self
    }

    /// Chain a built-in operation after the current transform.
    pub fn with_operation(mut self, op: Operation) -> Self {
        let previous = Arc::clone(&self.transform);
        let step = op.into_fn();
        self.transform = Arc::new(move |value: Value| -> Result<Value, BoxError> { step(previous(value)?) });
        self
    }

    /// Value used for keys absent from the row.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Declare a relation this column reads through, in addition to
    /// the ones derived from `__` in its keys.
    pub fn with_related(mut self, relation: impl Into<String>) -> Self {
        self.related.push(relation.into());
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Input keys, in declaration order. Never empty.
    pub fn inputs(&self) -> &[String] {
        &self.keys
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Relations needed by this column: key prefixes before the first `__`,
    /// followed by the explicitly declared ones. May repeat.
    pub fn related(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter_map(|key| key.split_once(RELATED_SEPARATOR).map(|(prefix, _)| prefix))
            .chain(self.related.iter().map(String::as_str))
    }

    /// Compute the cell for one row.
    ///
    /// An absent key is replaced by the default (or null); a key present with
    /// a null value stays null.
    pub fn value<C: RowContext + ?Sized>(&self, context: &C) -> ColumnResult<Value> {
        let values: Vec<Value> = self
            .keys
            .iter()
            .map(|key| match context.lookup(key) {
                Some(value) => value.clone(),
                None => self.default.clone().unwrap_or(Value::Null),
            })
            .collect();

        let reduced = (self.reduce)(values).map_err(|source| ColumnError::Reduce {
            header: self.header.clone(),
            source,
        })?;

        (self.transform)(reduced).map_err(|source| ColumnError::Transform {
            header: self.header.clone(),
            source,
        })
    }
}

fn identity(value: Value) -> Result<Value, BoxError> {
    Ok(value)
}

impl fmt::Debug for Col {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Col")
            .field("header", &self.header)
            .field("keys", &self.keys)
            .field("default", &self.default)
            .field("related", &self.related)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn inc(value: Value) -> Result<Value, BoxError> {
        let n = value.as_i64().ok_or("not an integer")?;
        Ok(json!(n + 1))
    }

    #[test]
    fn test_keys_default_to_header() {
        let col = Col::new("One");
        assert_eq!(col.inputs(), ["One"]);

        let col = Col::from_keys("Two", Vec::<String>::new());
        assert_eq!(col.inputs(), ["Two"]);
    }

    #[test]
    fn test_single_key_passthrough() {
        let col = Col::from_keys("Two", ["a"]);
        assert_eq!(col.value(&row(json!({"a": 1}))).unwrap(), json!(1));
    }

    #[test]
    fn test_last_value_wins_without_reducer() {
        let col = Col::from_keys("Name", ["first", "last"]);
        let value = col.value(&row(json!({"first": "Ada", "last": "Lovelace"}))).unwrap();
        assert_eq!(value, json!("Lovelace"));
    }

    #[test]
    fn test_sum_reducer() {
        let col = Col::from_keys("Three", ["b", "c"]).with_reduction(Reduction::Sum);
        assert_eq!(col.value(&row(json!({"b": 2, "c": 3}))).unwrap(), json!(5));
    }

    #[test]
    fn test_join_reducer() {
        let col = Col::from_keys("Four", ["d", "e"])
            .with_reduction(Reduction::Join { separator: " ".into() });
        let value = col.value(&row(json!({"d": "foo", "e": "bar"}))).unwrap();
        assert_eq!(value, json!("foo bar"));
    }

    #[test]
    fn test_transform() {
        let col = Col::from_keys("Header", ["key"]).with_transform(inc);
        assert_eq!(col.value(&row(json!({"key": 1}))).unwrap(), json!(2));
    }

    #[test]
    fn test_default_for_absent_key() {
        let col = Col::from_keys("Header", ["key"]).with_default(7);
        assert_eq!(col.value(&Map::new()).unwrap(), json!(7));
    }

    #[test]
    fn test_default_then_transform() {
        let col = Col::from_keys("Header", ["key"]).with_transform(inc).with_default(4);
        assert_eq!(col.value(&Map::new()).unwrap(), json!(5));
    }

    #[test]
    fn test_null_is_not_replaced_by_default() {
        let col = Col::from_keys("Header", ["key"]).with_default(7);
        assert_eq!(col.value(&row(json!({"key": null}))).unwrap(), Value::Null);
    }

    #[test]
    fn test_absent_without_default_is_null() {
        let col = Col::from_keys("Header", ["key"]);
        assert_eq!(col.value(&Map::new()).unwrap(), Value::Null);
    }

    #[test]
    fn test_reduce_sees_one_value_per_key_in_order() {
        let col = Col::from_keys("Seen", ["x", "y", "z"])
            .with_default("-")
            .with_reduce(|values| Ok(Value::Array(values)));
        let value = col.value(&row(json!({"z": 3, "x": 1}))).unwrap();
        assert_eq!(value, json!([1, "-", 3]));
    }

    #[test]
    fn test_transform_error_propagates() {
        let col = Col::from_keys("Header", ["key"]).with_transform(inc);
        let err = col.value(&row(json!({"key": "one"}))).unwrap_err();
        assert!(matches!(err, ColumnError::Transform { .. }));
        assert_eq!(err.header(), "Header");
        assert!(err.to_string().contains("not an integer"));
    }

    #[test]
    fn test_reduce_error_propagates() {
        let col = Col::from_keys("Total", ["a", "b"]).with_reduction(Reduction::Sum);
        let err = col.value(&row(json!({"a": 1, "b": "two"}))).unwrap_err();
        assert!(matches!(err, ColumnError::Reduce { .. }));
    }

    #[test]
    fn test_operations_chain_after_transform() {
        let col = Col::from_keys("Code", ["code"])
            .with_transform(|v| Ok(json!(format!(" {} ", v.as_str().unwrap_or_default()))))
            .with_operation(Operation::Trim)
            .with_operation(Operation::Uppercase);
        assert_eq!(col.value(&row(json!({"code": "ab"}))).unwrap(), json!("AB"));
    }

    #[test]
    fn test_related_prefixes() {
        let col = Col::from_keys("Club", ["club__name", "plain", "club__city__name"])
            .with_related("membership");
        let related: Vec<&str> = col.related().collect();
        assert_eq!(related, vec!["club", "club", "membership"]);
    }

    #[test]
    fn test_leading_separator_gives_empty_prefix() {
        let col = Col::from_keys("X", ["__x"]);
        assert_eq!(col.related().collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_replace_operation_applies_to_every_row() {
        let col = Col::from_keys("Phone", ["phone"]).with_operation(Operation::Replace {
            pattern: "[^0-9]".into(),
            value: String::new(),
        });
        assert_eq!(col.value(&row(json!({"phone": "01-23 45"}))).unwrap(), json!("012345"));
        assert_eq!(col.value(&row(json!({"phone": "(67) 89"}))).unwrap(), json!("6789"));
    }
}
