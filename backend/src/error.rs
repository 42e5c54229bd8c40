//! Error types for the spreadsheet export layer.
//!
//! - [`ColumnError`] - a user-supplied reduce/transform failed for one column
//! - [`DefinitionError`] - a JSON column definition could not be built
//! - [`CsvError`] - CSV input could not be parsed
//! - [`SourceError`] - row retrieval failed
//! - [`RenderError`] - spreadsheet encoding failed
//! - [`ConfigError`] - a view or the server is improperly configured
//! - [`ViewError`] - top-level export errors
//! - [`ServerError`] - HTTP server errors
//!
//! Conversions into [`ViewError`] are automatic via `From`,
//! so `?` works across layers.

use thiserror::Error;

/// Error type returned by user-supplied reduce and transform functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Column Errors
// =============================================================================

/// A column's reduce or transform function failed.
///
/// The underlying error is kept as the source, unmodified.
#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("Column '{header}': reduce failed: {source}")]
    Reduce {
        header: String,
        #[source]
        source: BoxError,
    },

    #[error("Column '{header}': transform failed: {source}")]
    Transform {
        header: String,
        #[source]
        source: BoxError,
    },
}

impl ColumnError {
    /// Header of the column that failed.
    pub fn header(&self) -> &str {
        match self {
            ColumnError::Reduce { header, .. } | ColumnError::Transform { header, .. } => header,
        }
    }
}

// =============================================================================
// Definition Errors
// =============================================================================

/// Errors building a [`crate::ColSpec`] from its JSON definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// JSON could not be deserialized.
    #[error("Invalid column definition JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A column is malformed.
    #[error("Invalid column #{index}: {message}")]
    InvalidColumn { index: usize, message: String },

    /// The definition file could not be read.
    #[error("Cannot read column definition: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors during CSV parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Nothing to parse.
    #[error("CSV file is empty")]
    Empty,

    /// Malformed CSV.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors from a [`crate::RowSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// A record is not a key/value object.
    #[error("Record {index} is not a JSON object")]
    NotAnObject { index: usize },

    /// The file extension is not a supported source format.
    #[error("Unsupported data file '{0}' (expected .csv or .json)")]
    UnsupportedFormat(String),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the data file failed.
    #[error("Cannot read data: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Render Errors
// =============================================================================

/// Errors encoding the spreadsheet.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// The grid does not fit a worksheet.
    #[error("Cell ({row}, {col}) is outside the worksheet")]
    OutOfBounds { row: usize, col: usize },

    #[error("Cannot serialize cell: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Improper configuration, raised before any data access.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The view has no column specification.
    #[error("{view} must define 'colspec'")]
    MissingColSpec { view: String },

    /// The view's column definition is invalid.
    #[error("{view}: {source}")]
    InvalidColSpec {
        view: String,
        #[source]
        source: DefinitionError,
    },

    /// Two views share a name.
    #[error("Duplicate view name: {0}")]
    DuplicateView(String),

    /// The configuration file could not be read.
    #[error("Cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON.
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// View Errors (top-level)
// =============================================================================

/// Errors returned by [`crate::ExcelView`].
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Improperly configured: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Column(#[from] ColumnError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No view registered under this name.
    #[error("Unknown view: {0}")]
    UnknownView(String),

    /// The blocking export task panicked or was cancelled.
    #[error("Export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type ColumnResult<T> = Result<T, ColumnError>;

pub type DefinitionResult<T> = Result<T, DefinitionError>;

pub type CsvResult<T> = Result<T, CsvError>;

pub type SourceResult<T> = Result<T, SourceError>;

pub type RenderResult<T> = Result<T, RenderError>;

pub type ViewResult<T> = Result<T, ViewError>;

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::Empty;
        let source_err: SourceError = csv_err.into();
        let view_err: ViewError = source_err.into();
        assert!(view_err.to_string().contains("empty"));

        let config_err = ConfigError::MissingColSpec { view: "MemberExport".into() };
        let view_err: ViewError = config_err.into();
        assert!(view_err.to_string().contains("MemberExport must define 'colspec'"));
    }

    #[test]
    fn test_column_error_keeps_source() {
        let err = ColumnError::Reduce {
            header: "Total".into(),
            source: "cannot sum a string".into(),
        };
        assert_eq!(err.header(), "Total");
        assert!(err.to_string().contains("cannot sum a string"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
