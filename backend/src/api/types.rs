//! REST API types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ConfiguredView;
use crate::error::{ServerError, ViewError};
use crate::render::OutputFormat;

/// A configured view as listed by `/api/views`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSummary {
    pub name: String,
    pub file_name: String,
    pub format: OutputFormat,

    /// Whether the view can be exported at all
    pub configured: bool,

    pub headers: Vec<String>,
    pub inputs: Vec<String>,

    /// Sorted relation names
    pub related: Vec<String>,
}

impl From<&ConfiguredView> for ViewSummary {
    fn from(configured: &ConfiguredView) -> Self {
        let view = &configured.view;
        let ready = view.colspec().is_ok();
        let (headers, inputs, related) = match view.colspec() {
            Ok(spec) => {
                let mut related: Vec<String> = spec.related().into_iter().map(str::to_string).collect();
                related.sort();
                (
                    spec.headers().into_iter().map(str::to_string).collect(),
                    spec.inputs().into_iter().map(str::to_string).collect(),
                    related,
                )
            }
            Err(_) => Default::default(),
        };

        ViewSummary {
            name: view.name().to_string(),
            file_name: view.file_name().to_string(),
            format: configured.format,
            configured: ready,
            headers,
            inputs,
            related,
        }
    }
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::UnknownView(_) => StatusCode::NOT_FOUND,
            ServerError::View(ViewError::Column(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::View(_) | ServerError::Config(_) | ServerError::Task(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(error_response(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colspec::{Col, ColSpec};
    use crate::error::{ColumnError, ConfigError};
    use crate::view::ExcelView;

    fn configured(view: ExcelView) -> ConfiguredView {
        ConfiguredView { view, source: "members.json".into(), format: OutputFormat::Xlsx }
    }

    #[test]
    fn test_summary() {
        let spec = ColSpec::new([
            Col::from_keys("Name", ["name"]),
            Col::from_keys("Where", ["club__city__name", "address__city"]),
        ]);
        let summary = ViewSummary::from(&configured(ExcelView::new("members").with_colspec(spec)));

        assert_eq!(summary.name, "members");
        assert_eq!(summary.file_name, "spreadsheet");
        assert!(summary.configured);
        assert_eq!(summary.headers, vec!["Name", "Where"]);
        assert_eq!(summary.inputs, vec!["name", "club__city__name", "address__city"]);
        assert_eq!(summary.related, vec!["address", "club"]);
    }

    #[test]
    fn test_summary_without_colspec() {
        let summary = ViewSummary::from(&configured(ExcelView::new("broken")));
        assert!(!summary.configured);
        assert!(summary.headers.is_empty());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServerError::UnknownView("x".into()).status_code(), StatusCode::NOT_FOUND);

        let column = ColumnError::Transform { header: "A".into(), source: "bad".into() };
        assert_eq!(
            ServerError::View(column.into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let config = ConfigError::MissingColSpec { view: "v".into() };
        assert_eq!(
            ServerError::View(config.into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response() {
        let body = error_response("Unknown view: nope");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Unknown view: nope");
    }
}
