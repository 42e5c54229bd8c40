//! # excel-view - declarative spreadsheet exports
//!
//! Describe the columns of a spreadsheet once, as a [`ColSpec`], and export
//! any row source through it as XLSX or CSV.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  RowSource  │────▶│   ColSpec   │────▶│  Responder  │────▶│ .xlsx/.csv  │
//! │ (JSON, CSV) │     │ (per row)   │     │ (render)    │     │ download    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use excel_view::{Col, ColSpec, CsvResponder, ExcelView, MemoryRowSource, Reduction};
//! use serde_json::json;
//!
//! let spec = ColSpec::new([
//!     Col::from_keys("Name", ["first", "last"]).with_reduction(Reduction::Join { separator: " ".into() }),
//!     Col::from_keys("Club", ["club__name"]).with_default("(none)"),
//! ]);
//! let view = ExcelView::new("members").with_colspec(spec);
//!
//! let source = MemoryRowSource::new(vec![json!({"first": "Ada", "last": "Lovelace"})]);
//! let response = view.get(&source, &CsvResponder::default()).unwrap();
//!
//! assert_eq!(response.file_name, "spreadsheet.csv");
//! assert_eq!(response.body, b"Name,Club\nAda Lovelace,(none)\n");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`colspec`] - Columns, reducers, operations and JSON definitions
//! - [`parser`] - CSV parsing with auto-detection
//! - [`source`] - Row retrieval
//! - [`render`] - XLSX and CSV responses
//! - [`view`] - The export view
//! - [`config`] - Server configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod colspec;

// Input
pub mod parser;
pub mod source;

// Output
pub mod render;
pub mod view;

// Serving
pub mod config;
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BoxError,
    ColumnError,
    ConfigError,
    CsvError,
    DefinitionError,
    RenderError,
    ServerError,
    SourceError,
    ViewError,
};

// =============================================================================
// Re-exports - Column specifications
// =============================================================================

pub use colspec::{
    example_definition,
    operations_description,
    Col,
    ColSpec,
    ColSpecDefinition,
    ColumnDefinition,
    Operation,
    ReduceFn,
    Reduction,
    RowContext,
    TransformFn,
    RELATED_SEPARATOR,
};

// =============================================================================
// Re-exports - Sources
// =============================================================================

pub use parser::{parse_bytes_auto, parse_csv, ParseResult};
pub use source::{load_source, MemoryRowSource, Row, RowQuery, RowSource, Rows};

// =============================================================================
// Re-exports - Rendering and views
// =============================================================================

pub use render::{
    CsvResponder,
    ExcelResponder,
    OutputFormat,
    SpreadsheetResponder,
    SpreadsheetResponse,
    XlsxResponder,
};
pub use view::ExcelView;

// =============================================================================
// Re-exports - Server
// =============================================================================

pub use config::{ConfiguredView, ServerConfig, ViewConfig};

pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
