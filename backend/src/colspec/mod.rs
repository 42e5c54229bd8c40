//! Declarative spreadsheet column specifications.
//!
//! - `col`: a single output column
//! - `spec`: the ordered column list and row lookup
//! - `reduce`: built-in reducers
//! - `operations`: built-in transforms
//! - `definition`: JSON definitions of a spec
//!
//! ## Example
//!
//! ```rust
//! use excel_view::{Col, ColSpec, Reduction};
//! use serde_json::json;
//!
//! let spec = ColSpec::new([
//!     Col::new("One"),
//!     Col::from_keys("Three", ["b", "c"]).with_reduction(Reduction::Sum),
//! ]);
//!
//! let row = json!({"One": 6, "b": 2, "c": 3});
//! assert_eq!(spec.headers(), vec!["One", "Three"]);
//! assert_eq!(spec.values(row.as_object().unwrap()).unwrap(), vec![json!(6), json!(5)]);
//! ```

pub mod col;
pub mod definition;
pub mod operations;
pub mod reduce;
pub mod spec;

pub use col::{Col, ReduceFn, TransformFn, RELATED_SEPARATOR};
pub use definition::{example_definition, ColSpecDefinition, ColumnDefinition};
pub use operations::{operations_description, Operation};
pub use reduce::Reduction;
pub use spec::{ColSpec, RowContext};
