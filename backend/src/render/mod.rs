//! Spreadsheet responses.
//!
//! A [`SpreadsheetResponder`] turns the exported grid (header row first)
//! and a file name into a downloadable artifact.
//!
//! - `xlsx`: Excel workbook via `rust_xlsxwriter`
//! - `delimited`: CSV via the `csv` crate
//!
//! [`ExcelResponder`] picks between the two: a workbook unless CSV is forced
//! or the grid does not fit a worksheet.

pub mod delimited;
pub mod xlsx;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RenderResult;

pub use delimited::CsvResponder;
pub use xlsx::{sanitize_sheet_name, XlsxResponder, MAX_COLS, MAX_ROWS};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// An encoded spreadsheet ready to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetResponse {
    /// File name including extension
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl SpreadsheetResponse {
    pub fn content_disposition(&self) -> String {
        let escaped = self.file_name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("attachment; filename=\"{}\"", escaped)
    }
}

impl IntoResponse for SpreadsheetResponse {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&self.content_disposition())
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(self.content_type)),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

/// Encodes a grid of cells (first row = headers) into a spreadsheet.
pub trait SpreadsheetResponder {
    fn respond(&self, data: &[Vec<Value>], file_name: &str) -> RenderResult<SpreadsheetResponse>;
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Workbook, falling back to CSV for oversized grids
    #[default]
    Auto,
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn responder(self) -> Box<dyn SpreadsheetResponder + Send + Sync> {
        match self {
            OutputFormat::Auto => Box::new(ExcelResponder::default()),
            OutputFormat::Xlsx => Box::new(XlsxResponder::default()),
            OutputFormat::Csv => Box::new(CsvResponder::default()),
        }
    }
}

/// Workbook output with a CSV fallback.
#[derive(Debug, Clone, Default)]
pub struct ExcelResponder {
    pub force_csv: bool,
    pub xlsx: XlsxResponder,
    pub csv: CsvResponder,
}

impl ExcelResponder {
    pub fn fits_worksheet(data: &[Vec<Value>]) -> bool {
        data.len() <= MAX_ROWS && data.iter().all(|row| row.len() <= MAX_COLS)
    }
}

impl SpreadsheetResponder for ExcelResponder {
    fn respond(&self, data: &[Vec<Value>], file_name: &str) -> RenderResult<SpreadsheetResponse> {
        if self.force_csv || !Self::fits_worksheet(data) {
            self.csv.respond(data, file_name)
        } else {
            self.xlsx.respond(data, file_name)
        }
    }
}

/// Text of a cell for text-only formats. Null is empty.
pub(crate) fn cell_text(value: &Value) -> RenderResult<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other)?,
    })
}

/// Append `extension` unless the name already ends with it.
pub(crate) fn with_extension(file_name: &str, extension: &str) -> String {
    let suffix = format!(".{}", extension);
    if file_name.to_lowercase().ends_with(&suffix) {
        file_name.to_string()
    } else {
        format!("{}{}", file_name, suffix)
    }
}
