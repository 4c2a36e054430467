use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One locale definition from static configuration. The model folder is
/// relative to `<model_root>/<recognizer>/models/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleDefinition {
    pub recognizer: String,
    pub locale: String,
    pub model_folder: String,
    /// Lets one recognizer/locale pairing beat out another when several
    /// recognizers serve the same locale.
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Root directory holding `<recognizer>/models/<folder>` trees.
    pub model_root: PathBuf,

    /// Locale applied at host startup. Leave unset for multi-language
    /// applications that select a locale once the user's language is known,
    /// to avoid loading a model that is immediately replaced.
    #[serde(default)]
    pub default_locale: Option<String>,

    #[serde(default, rename = "locale")]
    pub locales: Vec<LocaleDefinition>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl HostConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: HostConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}
