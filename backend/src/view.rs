//! The spreadsheet export view.
//!
//! ```text
//! RowSource ──▶ ColSpec::values (per row) ──▶ headers + rows ──▶ SpreadsheetResponder
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::colspec::ColSpec;
use crate::error::{ConfigError, ViewResult};
use crate::render::{SpreadsheetResponder, SpreadsheetResponse};
use crate::source::{RowQuery, RowSource};

pub const DEFAULT_FILE_NAME: &str = "spreadsheet";

/// Renders rows from a source as a spreadsheet download, one column per
/// [`crate::Col`] of its spec.
#[derive(Debug, Clone)]
pub struct ExcelView {
    name: String,
    file_name: String,
    colspec: Option<Arc<ColSpec>>,
}

impl ExcelView {
    /// A view without a column spec. Exporting fails until one is set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            colspec: None,
        }
    }

    pub fn with_colspec(mut self, colspec: impl Into<Arc<ColSpec>>) -> Self {
        self.colspec = Some(colspec.into());
        self
    }

    /// Download name, without extension.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn colspec(&self) -> Result<&ColSpec, ConfigError> {
        self.colspec
            .as_deref()
            .ok_or_else(|| ConfigError::MissingColSpec { view: self.name.clone() })
    }

    /// Header row followed by one row of values per source row.
    ///
    /// The column spec is checked before the source is touched.
    pub fn get_data(&self, source: &dyn RowSource) -> ViewResult<Vec<Vec<Value>>> {
        let colspec = self.colspec()?;
        let query = RowQuery::for_spec(colspec);

        log_info(format!("Exporting '{}' ({} columns)", self.name, colspec.len()));
        if !query.related.is_empty() {
            let mut related: Vec<&str> = query.related.iter().map(String::as_str).collect();
            related.sort_unstable();
            log_info_indent(format!("Related: {}", related.join(", ")), 1);
        }

        let header: Vec<Value> = colspec
            .headers()
            .into_iter()
            .map(|h| Value::String(h.to_string()))
            .collect();

        let mut data = vec![header];
        for row in source.fetch(&query)? {
            data.push(colspec.values(&row?)?);
        }

        match data.len() - 1 {
            0 => log_warning(format!("'{}': source returned no rows", self.name)),
            rows => log_success(format!("'{}': {} rows", self.name, rows)),
        }
        Ok(data)
    }

    /// Export the source through `responder`.
    pub fn get(
        &self,
        source: &dyn RowSource,
        responder: &dyn SpreadsheetResponder,
    ) -> ViewResult<SpreadsheetResponse> {
        let data = self.get_data(source)?;
        let response = responder.respond(&data, &self.file_name)?;
        log_success(format!("'{}' → {} ({} bytes)", self.name, response.file_name, response.body.len()));
        Ok(response)
    }
}
