//! Configuration for impress-bibdb
//!
//! Output layout and parse-session defaults. Read from TOML:
//!
//! ```toml
//! [format]
//! indent = "  "
//! timestamp_field = "date-modified"
//! keep_raw_unmodified = true
//!
//! [parse]
//! month_macros = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entry::is_field_name_char;
use crate::error::ConfigError;
use crate::formatter::FormatOptions;
use crate::macros::MacroTable;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BibConfig {
    /// Output layout
    pub format: FormatOptions,
    /// Parse-session settings
    pub parse: ParseConfig,
}

/// Parse-session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Predefine `jan` .. `dec` before reading
    pub month_macros: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self { month_macros: true }
    }
}

impl ParseConfig {
    /// Macro table a new parse session starts with
    pub fn initial_macros(&self) -> MacroTable {
        if self.month_macros {
            MacroTable::with_month_names()
        } else {
            MacroTable::new()
        }
    }
}

impl BibConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/impress-bibdb/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("impress-bibdb").join("config.toml"))
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the default location, or fall back to defaults when no
    /// file exists there
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.format.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(ConfigError::Invalid(
                "format.indent may only contain spaces and tabs".to_string(),
            ));
        }

        if let Some(field) = &self.format.timestamp_field {
            if field.is_empty() || !field.chars().all(is_field_name_char) {
                return Err(ConfigError::Invalid(format!(
                    "format.timestamp_field `{}` is not a valid field name",
                    field
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BibConfig::default();
        assert_eq!(config.format.indent, "    ");
        assert_eq!(config.format.timestamp_field.as_deref(), Some("timestamp"));
        assert!(!config.format.keep_raw_unmodified);
        assert!(config.parse.month_macros);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BibConfig::from_toml("[format]\nindent = \"\\t\"\n").unwrap();
        assert_eq!(config.format.indent, "\t");
        assert_eq!(config.format.timestamp_field.as_deref(), Some("timestamp"));
        assert!(config.parse.month_macros);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = BibConfig::default();
        config.format.keep_raw_unmodified = true;
        config.parse.month_macros = false;

        let toml_str = config.to_toml().unwrap();
        assert_eq!(BibConfig::from_toml(&toml_str).unwrap(), config);

        let json = config.to_json().unwrap();
        assert_eq!(BibConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BibConfig::default();
        config.format.indent = "--".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = BibConfig::default();
        config.format.timestamp_field = Some("date modified".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[parse]\nmonth_macros = false\n").unwrap();

        let config = BibConfig::load(&path).unwrap();
        assert!(!config.parse.month_macros);
        assert!(config.parse.initial_macros().is_empty());
        assert!(BibConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
