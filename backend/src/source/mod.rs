//! Row retrieval.
//!
//! A [`RowSource`] hands out key/value rows restricted to the fields a
//! [`ColSpec`] reads, with the relations it needs resolved. Sources are free
//! to leave a field out of a row; the column's default then applies.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use crate::colspec::{ColSpec, RELATED_SEPARATOR};
use crate::error::{SourceError, SourceResult};
use crate::parser::parse_bytes_auto;

/// One input row.
pub type Row = Map<String, Value>;

/// Lazily produced rows.
pub type Rows<'a> = Box<dyn Iterator<Item = SourceResult<Row>> + 'a>;

/// What to fetch: the fields to keep and the relations to resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub fields: Vec<String>,
    pub related: HashSet<String>,
}

impl RowQuery {
    pub fn for_spec(spec: &ColSpec) -> Self {
        Self {
            fields: spec.inputs().into_iter().map(str::to_string).collect(),
            related: spec.related().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Something that produces input rows.
pub trait RowSource {
    fn fetch<'a>(&'a self, query: &'a RowQuery) -> SourceResult<Rows<'a>>;
}

/// Rows held in memory as JSON records.
///
/// Relations are nested objects: the field `club__name` is read from
/// `record["club"]["name"]` unless the record has a flat `club__name` key.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    records: Vec<Value>,
}

impl MemoryRowSource {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RowSource for MemoryRowSource {
    fn fetch<'a>(&'a self, query: &'a RowQuery) -> SourceResult<Rows<'a>> {
        let rows = self.records.iter().enumerate().map(move |(index, record)| -> SourceResult<Row> {
            let obj = record.as_object().ok_or(SourceError::NotAnObject { index })?;
            Ok(project(obj, query))
        });
        Ok(Box::new(rows))
    }
}

/// Keep the queried fields of a record. An empty field list keeps everything.
fn project(record: &Row, query: &RowQuery) -> Row {
    if query.fields.is_empty() {
        return record.clone();
    }

    let mut row = Row::new();
    for field in &query.fields {
        if row.contains_key(field) {
            continue;
        }
        if let Some(value) = resolve(record, field, &query.related) {
            row.insert(field.clone(), value.clone());
        }
    }
    row
}

fn resolve<'r>(record: &'r Row, field: &str, related: &HashSet<String>) -> Option<&'r Value> {
    if let Some(value) = record.get(field) {
        return Some(value);
    }

    let (relation, rest) = field.split_once(RELATED_SEPARATOR)?;
    if !related.contains(relation) {
        return None;
    }

    let mut current = record.get(relation)?;
    for part in rest.split(RELATED_SEPARATOR) {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Load rows from a `.json` file (array of objects) or a `.csv` file.
pub fn load_source(path: impl AsRef<Path>) -> SourceResult<MemoryRowSource> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("json") => {
            let content = std::fs::read_to_string(path)?;
            let records: Vec<Value> = serde_json::from_str(&content)?;
            Ok(MemoryRowSource::new(records))
        }
        Some("csv") => {
            let bytes = std::fs::read(path)?;
            Ok(MemoryRowSource::new(parse_bytes_auto(&bytes)?.records))
        }
        _ => Err(SourceError::UnsupportedFormat(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colspec::Col;
    use serde_json::json;
    use std::io::Write;

    fn query(fields: &[&str], related: &[&str]) -> RowQuery {
        RowQuery {
            fields: fields.iter().map(|s| s.to_string()).collect(),
            related: related.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn fetch_all(source: &MemoryRowSource, query: &RowQuery) -> Vec<Row> {
        source.fetch(query).unwrap().collect::<SourceResult<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_query_for_spec() {
        let spec = ColSpec::new([
            Col::from_keys("Name", ["name"]),
            Col::from_keys("Club", ["club__name", "club__city"]),
        ]);
        let q = RowQuery::for_spec(&spec);
        assert_eq!(q.fields, vec!["name", "club__name", "club__city"]);
        assert_eq!(q.related, HashSet::from(["club".to_string()]));
    }

    #[test]
    fn test_projection_keeps_requested_fields() {
        let source = MemoryRowSource::new(vec![json!({"name": "Ada", "secret": "x", "age": null})]);
        let rows = fetch_all(&source, &query(&["name", "age", "missing"], &[]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("Ada")));
        assert_eq!(rows[0].get("age"), Some(&Value::Null));
        assert!(!rows[0].contains_key("secret"));
        assert!(!rows[0].contains_key("missing"));
    }

    #[test]
    fn test_empty_query_returns_whole_records() {
        let source = MemoryRowSource::new(vec![json!({"a": 1, "b": 2})]);
        let rows = fetch_all(&source, &RowQuery::default());
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_related_fields_resolved_from_nested_objects() {
        let source = MemoryRowSource::new(vec![
            json!({"name": "Ada", "club": {"name": "Analytical", "city": {"name": "London"}}}),
            json!({"name": "Bob", "club": null}),
        ]);
        let q = query(&["club__name", "club__city__name"], &["club"]);
        let rows = fetch_all(&source, &q);

        assert_eq!(rows[0].get("club__name"), Some(&json!("Analytical")));
        assert_eq!(rows[0].get("club__city__name"), Some(&json!("London")));
        assert!(rows[1].is_empty());
    }

    #[test]
    fn test_relation_not_requested_is_not_followed() {
        let source = MemoryRowSource::new(vec![json!({"club": {"name": "Analytical"}})]);
        let rows = fetch_all(&source, &query(&["club__name"], &[]));
        assert!(rows[0].is_empty());
    }

    #[test]
    fn test_flat_key_wins_over_relation() {
        let source = MemoryRowSource::new(vec![json!({"club__name": "Flat", "club": {"name": "Nested"}})]);
        let rows = fetch_all(&source, &query(&["club__name"], &["club"]));
        assert_eq!(rows[0].get("club__name"), Some(&json!("Flat")));
    }

    #[test]
    fn test_non_object_record_is_error() {
        let source = MemoryRowSource::new(vec![json!({"a": 1}), json!([1, 2])]);
        let results: Vec<_> = source.fetch(&RowQuery::default()).unwrap().collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(SourceError::NotAnObject { index: 1 })));
    }

    #[test]
    fn test_load_json_and_csv() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("members.json");
        std::fs::write(&json_path, r#"[{"name": "Ada"}, {"name": "Bob"}]"#).unwrap();
        assert_eq!(load_source(&json_path).unwrap().len(), 2);

        let csv_path = dir.path().join("members.CSV");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "name;fee").unwrap();
        writeln!(file, "Ada;30").unwrap();
        let source = load_source(&csv_path).unwrap();
        let rows = fetch_all(&source, &query(&["fee"], &[]));
        assert_eq!(rows[0].get("fee"), Some(&json!("30")));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let result = load_source("members.xml");
        assert!(matches!(result, Err(SourceError::UnsupportedFormat(_))));
    }
}
