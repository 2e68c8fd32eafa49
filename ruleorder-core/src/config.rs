use crate::error::{Result, RuleOrderError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_file_extension() -> String {
    "xml".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Directory the file picker starts in (defaults to the game's Filters folder)
    #[serde(default)]
    pub filters_dir: Option<PathBuf>,
    /// Whether a rule may be dropped into a different file's list.
    /// When false, drags only reorder within their own list.
    #[serde(default = "default_true")]
    pub allow_cross_document_drag: bool,
    /// Extension the file picker filters on, without the dot
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            filters_dir: None,
            allow_cross_document_drag: true,
            file_extension: default_file_extension(),
        }
    }
}

impl EditorConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RuleOrderError::io(path, e))?;
        Self::from_yaml(&content).map_err(|e| RuleOrderError::parse(path, e))
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("Failed to load config from {p}, using defaults: {e}");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
