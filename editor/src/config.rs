use std::path::Path;

use graphedit_core::command::DEFAULT_MAX_UNDO;
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Controller settings, usually loaded from `editor.toml`.
///
/// ```toml
/// max_undo = 200
/// authoring_mode = true
///
/// [validation]
/// enabled = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Undo steps kept before the oldest is dropped.
    pub max_undo: usize,
    /// Whether the controller starts in authoring mode.
    pub authoring_mode: bool,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Run the validation provider on authoring changes.
    pub enabled: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
            authoring_mode: true,
            validation: ValidationConfig::default(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl EditorConfig {
    /// Parses a config from TOML text. Missing keys take default values.
    pub fn from_toml_str(content: &str) -> Result<Self, EditorError> {
        toml::from_str(content).map_err(|e| EditorError::Config(format!("failed to parse config: {e}")))
    }

    /// Loads a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EditorError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| EditorError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Loads a config, falling back to defaults when the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!(
                    "Loaded editor config: max_undo={}, validation={}",
                    config.max_undo,
                    config.validation.enabled
                );
                config
            }
            Err(e) => {
                log::warn!("{e}, using defaults");
                Self::default()
            }
        }
    }
}
