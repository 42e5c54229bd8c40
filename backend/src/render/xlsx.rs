//! Excel workbook output.

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::Value;

use super::{cell_text, with_extension, SpreadsheetResponder, SpreadsheetResponse, XLSX_CONTENT_TYPE};
use crate::error::{RenderError, RenderResult};

/// Rows in one worksheet.
pub const MAX_ROWS: usize = 1_048_576;
/// Columns in one worksheet.
pub const MAX_COLS: usize = 16_384;

const SHEET_NAME_MAX_LEN: usize = 31;
const SHEET_NAME_ILLEGAL: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Writes the grid to a single worksheet.
///
/// The header row is bold and frozen. Null cells stay blank, booleans and
/// numbers keep their type, and arrays or objects are written as JSON text.
#[derive(Debug, Clone)]
pub struct XlsxResponder {
    pub sheet_name: String,
    pub bold_header: bool,
}

impl Default for XlsxResponder {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            bold_header: true,
        }
    }
}

impl XlsxResponder {
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Encode the grid as an `.xlsx` workbook.
    pub fn to_bytes(&self, data: &[Vec<Value>]) -> RenderResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = if self.bold_header {
            Format::new().set_bold()
        } else {
            Format::new()
        };

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sanitize_sheet_name(&self.sheet_name))?;

        for (row_idx, row) in data.iter().enumerate() {
            let row_num = cast_row_num(row_idx, 0)?;
            for (col_idx, value) in row.iter().enumerate() {
                let col_num = cast_col_num(row_idx, col_idx)?;
                if row_idx == 0 {
                    worksheet.write_string_with_format(row_num, col_num, cell_text(value)?, &header_format)?;
                } else {
                    write_cell(worksheet, row_num, col_num, value)?;
                }
            }
        }
        if !data.is_empty() {
            worksheet.set_freeze_panes(1, 0)?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

impl SpreadsheetResponder for XlsxResponder {
    fn respond(&self, data: &[Vec<Value>], file_name: &str) -> RenderResult<SpreadsheetResponse> {
        Ok(SpreadsheetResponse {
            file_name: with_extension(file_name, "xlsx"),
            content_type: XLSX_CONTENT_TYPE,
            body: self.to_bytes(data)?,
        })
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> RenderResult<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(number) => {
                worksheet.write_number(row, col, number)?;
            }
            None => {
                worksheet.write_string(row, col, n.to_string())?;
            }
        },
        other => {
            worksheet.write_string(row, col, cell_text(other)?)?;
        }
    }
    Ok(())
}

fn cast_row_num(row: usize, col: usize) -> RenderResult<u32> {
    u32::try_from(row)
        .ok()
        .filter(|_| row < MAX_ROWS)
        .ok_or(RenderError::OutOfBounds { row, col })
}

fn cast_col_num(row: usize, col: usize) -> RenderResult<u16> {
    u16::try_from(col)
        .ok()
        .filter(|_| col < MAX_COLS)
        .ok_or(RenderError::OutOfBounds { row, col })
}

/// Replace characters Excel rejects and trim to a valid sheet name.
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if SHEET_NAME_ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    if trimmed.is_empty() {
        return "Sheet1".to_string();
    }
    trimmed.chars().take(SHEET_NAME_MAX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_workbook_bytes() {
        let data = vec![
            vec![json!("Name"), json!("Fee"), json!("Active"), json!("Tags")],
            vec![json!("Ada"), json!(30), json!(true), json!(["a", "b"])],
            vec![json!("Bob"), Value::Null, json!(false), json!({"k": 1})],
        ];
        let bytes = XlsxResponder::default().to_bytes(&data).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_empty_grid() {
        let bytes = XlsxResponder::default().to_bytes(&[]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_respond() {
        let responder = XlsxResponder::default().with_sheet_name("Members [2024]");
        let response = responder.respond(&[vec![json!("A")]], "members").unwrap();
        assert_eq!(response.file_name, "members.xlsx");
        assert_eq!(response.content_type, XLSX_CONTENT_TYPE);
        assert!(response.body.starts_with(b"PK"));
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(cast_col_num(0, MAX_COLS - 1).is_ok());
        assert!(matches!(
            cast_col_num(3, MAX_COLS),
            Err(RenderError::OutOfBounds { row: 3, col: MAX_COLS })
        ));
        assert!(cast_row_num(MAX_ROWS, 0).is_err());
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Members [2024]"), "Members _2024_");
        assert_eq!(sanitize_sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  "), "Sheet1");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);
    }
}
