//! Index configuration: settings, definition model, merging and resolution.

pub mod definition;
pub mod merge;
pub mod resolver;

pub use definition::{
    IndexDefinition, Identifier, END_DEFAULT_TAG, FILE_KIND, IGNORE_KIND, ITEM_KIND, ROOT_NAME,
};
pub use merge::merge;
pub use resolver::{IndexDefinitions, Resolver};

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Settings for locating and reading index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Suffix of the root marker file, appended to `root_name`.
    pub config_suffix: String,
    pub root_name: String,
    /// User-level defaults merged beneath the project's root marker.
    pub base_config: Option<PathBuf>,
    pub follow_links: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            config_suffix: ".config".to_string(),
            root_name: ROOT_NAME.to_string(),
            base_config: None,
            follow_links: false,
        }
    }
}

impl IndexerConfig {
    /// Defaults plus the user-level base config, if one exists.
    pub fn with_user_defaults() -> Self {
        let base = Self::default_base_config_path().filter(|p| p.is_file());
        Self {
            base_config: base,
            ..Self::default()
        }
    }

    /// `~/.source_framework/root.config`.
    pub fn default_base_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".source_framework").join("root.config"))
    }

    /// File name of the root marker, e.g. `root.config`.
    pub fn root_marker_name(&self) -> String {
        format!("{}{}", self.root_name, self.config_suffix)
    }
}

/// Read and parse a YAML file. An empty file reads as an empty mapping.
pub fn load_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
    let value: Value = serde_yaml::from_str(&content).map_err(|source| IndexError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match value {
        Value::Null => Value::Mapping(Default::default()),
        other => other,
    })
}

/// Read a YAML file that must hold a mapping at its top level.
pub fn load_yaml_mapping(path: &Path) -> Result<serde_yaml::Mapping> {
    match load_yaml(path)? {
        Value::Mapping(m) => Ok(m),
        other => Err(IndexError::config(
            path,
            format!("expected a YAML mapping at the top level, found {other:?}"),
        )),
    }
}
