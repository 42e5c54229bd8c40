//! Column specification definitions.
//!
//! The JSON form of a [`ColSpec`], for specs kept in files and
//! server configuration rather than built in code.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use super::col::Col;
use super::operations::Operation;
use super::reduce::Reduction;
use super::spec::ColSpec;
use crate::error::{DefinitionError, DefinitionResult};

/// A complete column specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColSpecDefinition {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Output columns, in order
    pub columns: Vec<ColumnDefinition>,
}

/// Definition of a single output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Header row text
    pub header: String,

    /// Input keys; the header when empty
    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default)]
    pub reduce: Reduction,

    /// Ordered list of operations applied after reducing
    #[serde(default)]
    pub operations: Vec<Operation>,

    /// Value used for absent keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Relations needed beyond those named in the keys
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl ColSpecDefinition {
    /// Parse a definition from JSON string
    pub fn from_json(json: &str) -> DefinitionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a definition from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> DefinitionResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> DefinitionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every column and build the specification.
    pub fn build(&self) -> DefinitionResult<ColSpec> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, column)| column.build(index))
            .collect()
    }
}

impl ColumnDefinition {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            keys: Vec::new(),
            reduce: Reduction::default(),
            operations: Vec::new(),
            default: None,
            related: Vec::new(),
        }
    }

    pub fn with_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reduce(mut self, reduce: Reduction) -> Self {
        self.reduce = reduce;
        self
    }

    /// Add an operation to the chain
    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn build(&self, index: usize) -> DefinitionResult<Col> {
        let invalid = |message: String| DefinitionError::InvalidColumn { index, message };

        if self.header.trim().is_empty() {
            return Err(invalid("header is empty".into()));
        }
        if self.keys.iter().any(|k| k.trim().is_empty()) {
            return Err(invalid(format!("'{}' has an empty key", self.header)));
        }
        for op in &self.operations {
            if let Operation::Replace { pattern, .. } = op {
                Regex::new(pattern)
                    .map_err(|e| invalid(format!("'{}' has an invalid pattern: {}", self.header, e)))?;
            }
        }

        let mut col = Col::from_keys(self.header.clone(), self.keys.iter().cloned())
            .with_reduction(self.reduce.clone());
        for op in &self.operations {
            col = col.with_operation(op.clone());
        }
        if let Some(default) = &self.default {
            col = col.with_default(default.clone());
        }
        for relation in &self.related {
            col = col.with_related(relation.clone());
        }
        Ok(col)
    }
}

/// Generate an example definition for documentation
pub fn example_definition() -> ColSpecDefinition {
    ColSpecDefinition {
        description: "Example member export".to_string(),
        columns: vec![
            ColumnDefinition::new("Member")
                .with_keys(["first_name", "last_name"])
                .with_reduce(Reduction::Join { separator: " ".to_string() })
                .with_operation(Operation::Trim),
            ColumnDefinition::new("Email")
                .with_keys(["email"])
                .with_operation(Operation::Lowercase)
                .with_default(Value::String(String::new())),
            ColumnDefinition::new("Club")
                .with_keys(["club__name"])
                .with_default(Value::String("(none)".to_string())),
            ColumnDefinition::new("Paid")
                .with_keys(["fee_2023", "fee_2024"])
                .with_reduce(Reduction::Sum)
                .with_default(Value::from(0)),
            ColumnDefinition::new("Joined")
                .with_keys(["joined"])
                .with_operation(Operation::ExtractYear),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_definition_serialization() {
        let definition = example_definition();
        let json = definition.to_json().unwrap();
        let parsed = ColSpecDefinition::from_json(&json).unwrap();
        assert_eq!(parsed, definition);
    }

    #[test]
    fn test_defaults_when_fields_omitted() {
        let definition = ColSpecDefinition::from_json(r#"{"columns": [{"header": "Name"}]}"#).unwrap();
        let column = &definition.columns[0];
        assert!(column.keys.is_empty());
        assert_eq!(column.reduce, Reduction::Last);
        assert!(column.operations.is_empty());
        assert!(column.default.is_none());

        let spec = definition.build().unwrap();
        assert_eq!(spec.inputs(), vec!["Name"]);
    }

    #[test]
    fn test_build_example() {
        let spec = example_definition().build().unwrap();
        assert_eq!(spec.headers(), vec!["Member", "Email", "Club", "Paid", "Joined"]);
        assert_eq!(spec.related(), HashSet::from(["club"]));

        let row = json!({
            "first_name": " Ada",
            "last_name": "Lovelace ",
            "email": "ADA@EXAMPLE.ORG",
            "fee_2024": 30,
            "joined": "1833-06-05"
        });
        let values = spec.values(row.as_object().unwrap()).unwrap();
        assert_eq!(
            values,
            vec![json!("Ada Lovelace"), json!("ada@example.org"), json!("(none)"), json!(30), json!(1833)]
        );
    }

    #[test]
    fn test_declared_related() {
        let definition = ColSpecDefinition::from_json(
            r#"{"columns": [{"header": "Fee", "keys": ["fee"], "related": ["membership"]}]}"#,
        )
        .unwrap();
        assert_eq!(definition.build().unwrap().related(), HashSet::from(["membership"]));
    }

    #[test]
    fn test_invalid_columns() {
        let definition = ColSpecDefinition::from_json(r#"{"columns": [{"header": "  "}]}"#).unwrap();
        assert!(matches!(definition.build(), Err(DefinitionError::InvalidColumn { index: 0, .. })));

        let definition = ColSpecDefinition::from_json(
            r#"{"columns": [{"header": "A"}, {"header": "B", "keys": ["ok", ""]}]}"#,
        )
        .unwrap();
        assert!(matches!(definition.build(), Err(DefinitionError::InvalidColumn { index: 1, .. })));

        let definition = ColSpecDefinition::from_json(
            r#"{"columns": [{"header": "A", "operations": [{"type": "replace", "pattern": "("}]}]}"#,
        )
        .unwrap();
        let err = definition.build().unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let result = ColSpecDefinition::from_json(
            r#"{"columns": [{"header": "A", "operations": [{"type": "explode"}]}]}"#,
        );
        assert!(matches!(result, Err(DefinitionError::Json(_))));
    }
}
