//! Pipeline configuration, loadable from TOML.

use std::path::Path;

use ibmi_encoding::{TextEncoding, DEFAULT_ENCODINGS};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kind::Mode;
use crate::Result;

/// Settings shared by every file of a pipeline run.
///
/// ```toml
/// encodings = ["utf-8", "cp037"]
/// max_workers = 4
/// grammar = true
/// mode = "combined"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Encodings tried by the source loader, in order.
    pub encodings: Vec<String>,
    /// Worker threads; `None` uses rayon's default.
    pub max_workers: Option<usize>,
    /// Try the grammar strategy before the fallback.
    pub grammar: bool,
    pub mode: Mode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encodings: DEFAULT_ENCODINGS.iter().map(|e| e.name().to_string()).collect(),
            max_workers: None,
            grammar: cfg!(feature = "grammar"),
            mode: Mode::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check encoding names and the worker count.
    pub fn validate(&self) -> Result<()> {
        self.text_encodings()?;
        match self.max_workers {
            Some(0) => Err(ConfigError::InvalidWorkers { value: 0 }),
            _ => Ok(()),
        }
    }

    /// The configured encodings, resolved.
    pub fn text_encodings(&self) -> Result<Vec<TextEncoding>> {
        self.encodings
            .iter()
            .map(|name| {
                TextEncoding::from_name(name).ok_or_else(|| ConfigError::UnknownEncoding { name: name.clone() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.encodings, vec!["utf-8", "cp037", "cp500", "latin-1"]);
        assert_eq!(config.max_workers, None);
        assert_eq!(config.mode, Mode::Combined);
        assert_eq!(config.grammar, cfg!(feature = "grammar"));
        assert_eq!(config.text_encodings().unwrap(), DEFAULT_ENCODINGS.to_vec());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str("max_workers = 2\nmode = \"rpg\"\n").unwrap();
        assert_eq!(config.max_workers, Some(2));
        assert_eq!(config.mode, Mode::Rpg);
        assert_eq!(config.encodings.len(), 4);

        let config = PipelineConfig::from_toml_str("encodings = [\"IBM037\", \"latin1\"]\ngrammar = false").unwrap();
        assert_eq!(
            config.text_encodings().unwrap(),
            vec![TextEncoding::Cp037, TextEncoding::Latin1]
        );
        assert!(!config.grammar);
    }

    #[test]
    fn test_invalid_configs() {
        let err = PipelineConfig::from_toml_str("encodings = [\"utf-16\"]").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEncoding { ref name } if name == "utf-16"));
        let err = PipelineConfig::from_toml_str("max_workers = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorkers { value: 0 }));
        let err = PipelineConfig::from_toml_str("mode = \"cobol\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let err = PipelineConfig::from_toml_str("max_workers = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ibmi.toml");
        std::fs::write(&path, "grammar = false\n").unwrap();
        assert!(!PipelineConfig::from_file(&path).unwrap().grammar);
        let err = PipelineConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
