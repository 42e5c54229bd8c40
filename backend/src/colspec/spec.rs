//! Ordered column specification.
//!
//! A spreadsheet export wants a list of lists with the headers in the first
//! row, while data sources hand out one key/value row at a time.
//! [`ColSpec`] declares the mapping between the two once and is then reused
//! for every row.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::col::Col;
use crate::error::ColumnResult;

/// Key/value row a column reads from.
///
/// `lookup` distinguishes an absent key (`None`) from a key present with a
/// null value (`Some(&Value::Null)`).
pub trait RowContext {
    fn lookup(&self, key: &str) -> Option<&Value>;
}

impl RowContext for Map<String, Value> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl<S: std::hash::BuildHasher> RowContext for HashMap<String, Value, S> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl RowContext for BTreeMap<String, Value> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

/// Columns of a spreadsheet, in output order.
#[derive(Debug, Clone, Default)]
pub struct ColSpec {
    cols: Vec<Col>,
}

impl ColSpec {
    pub fn new(cols: impl IntoIterator<Item = Col>) -> Self {
        Self {
            cols: cols.into_iter().collect(),
        }
    }

    pub fn cols(&self) -> &[Col] {
        &self.cols
    }

    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Every input key required by the columns, flattened in column order.
    /// Keys shared by several columns appear once per column.
    pub fn inputs(&self) -> Vec<&str> {
        self.cols
            .iter()
            .flat_map(|col| col.inputs().iter().map(String::as_str))
            .collect()
    }

    /// The header row.
    pub fn headers(&self) -> Vec<&str> {
        self.cols.iter().map(Col::header).collect()
    }

    /// One spreadsheet data row. Fails on the first column whose
    /// reduce or transform fails.
    pub fn values<C: RowContext + ?Sized>(&self, context: &C) -> ColumnResult<Vec<Value>> {
        self.cols.iter().map(|col| col.value(context)).collect()
    }

    /// Relations to fetch alongside the rows: the distinct prefixes before
    /// `__` in the input keys, plus relations declared on the columns.
    pub fn related(&self) -> HashSet<&str> {
        self.cols.iter().flat_map(Col::related).collect()
    }
}

impl FromIterator<Col> for ColSpec {
    fn from_iter<I: IntoIterator<Item = Col>>(iter: I) -> Self {
        Self::new(iter)
    }
}
