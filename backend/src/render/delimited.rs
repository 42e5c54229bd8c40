//! CSV output.

use serde_json::Value;

use super::{cell_text, with_extension, SpreadsheetResponder, SpreadsheetResponse, CSV_CONTENT_TYPE};
use crate::error::RenderResult;

/// Writes the grid as delimited text. Null cells are empty.
#[derive(Debug, Clone)]
pub struct CsvResponder {
    pub delimiter: u8,
}

impl Default for CsvResponder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvResponder {
    pub fn to_bytes(&self, data: &[Vec<Value>]) -> RenderResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());

        for row in data {
            let cells = row.iter().map(cell_text).collect::<RenderResult<Vec<_>>>()?;
            writer.write_record(&cells)?;
        }

        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()).into())
    }
}

impl SpreadsheetResponder for CsvResponder {
    fn respond(&self, data: &[Vec<Value>], file_name: &str) -> RenderResult<SpreadsheetResponse> {
        Ok(SpreadsheetResponse {
            file_name: with_extension(file_name, "csv"),
            content_type: CSV_CONTENT_TYPE,
            body: self.to_bytes(data)?,
        })
    }
}
