//! Server configuration (`views.json`).
//!
//! ```json
//! {
//!   "views": [
//!     {
//!       "name": "members",
//!       "file_name": "members",
//!       "source": "data/members.json",
//!       "format": "xlsx",
//!       "colspec": { "columns": [{ "header": "Name", "keys": ["name"] }] }
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::colspec::ColSpecDefinition;
use crate::error::{ConfigError, ViewResult};
use crate::render::{OutputFormat, SpreadsheetResponse};
use crate::source::load_source;
use crate::view::{ExcelView, DEFAULT_FILE_NAME};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub views: Vec<ViewConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: String,

    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// `.json` or `.csv` data file
    pub source: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,

    /// Left optional so a view without one is reported at export time
    #[serde(default)]
    pub colspec: Option<ColSpecDefinition>,
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

/// A view ready to serve: the view, where its rows come from and how to encode them.
#[derive(Debug, Clone)]
pub struct ConfiguredView {
    pub view: ExcelView,
    pub source: PathBuf,
    pub format: OutputFormat,
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build every view, keyed by name.
    pub fn build(&self) -> Result<HashMap<String, ConfiguredView>, ConfigError> {
        let mut views = HashMap::with_capacity(self.views.len());
        for config in &self.views {
            if views.contains_key(&config.name) {
                return Err(ConfigError::DuplicateView(config.name.clone()));
            }
            views.insert(config.name.clone(), config.build()?);
        }
        Ok(views)
    }
}

impl ViewConfig {
    pub fn build(&self) -> Result<ConfiguredView, ConfigError> {
        let mut view = ExcelView::new(self.name.clone()).with_file_name(self.file_name.clone());
        if let Some(definition) = &self.colspec {
            let colspec = definition.build().map_err(|source| ConfigError::InvalidColSpec {
                view: self.name.clone(),
                source,
            })?;
            view = view.with_colspec(colspec);
        }

        Ok(ConfiguredView {
            view,
            source: self.source.clone(),
            format: self.format,
        })
    }
}

impl ConfiguredView {
    /// Load the source and render it.
    pub fn export(&self) -> ViewResult<SpreadsheetResponse> {
        self.view.colspec()?;
        let source = load_source(&self.source)?;
        let responder = self.format.responder();
        self.view.get(&source, responder.as_ref())
    }
}
