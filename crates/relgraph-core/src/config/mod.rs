//! Configuration management for relgraph.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every field, so an absent file means "use the GQA layout".

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for relgraph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Raw dataset layout
    pub dataset: DatasetConfig,

    /// Annotation building settings
    pub annotations: AnnotationConfig,

    /// Image scale settings
    pub image_scale: ImageScaleConfig,

    /// Word-vector settings
    pub embedding: EmbeddingConfig,

    /// Artifact file names
    pub artifacts: ArtifactsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.relgraph.relgraph/config.toml
    /// - Linux: ~/.config/relgraph/config.toml
    ///
    /// Falls back to ~/.relgraph/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "relgraph", "relgraph")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".relgraph").join("config.toml")
            })
    }

    /// Resolved raw corpus root (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        expand(&self.general.data_dir)
    }

    /// Resolved artifact directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.general.output_dir)
    }

    /// Resolved image directory.
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir().join(&self.dataset.images_dir)
    }

    /// Resolved word-vector file, if one is configured.
    pub fn vectors_path(&self) -> Option<PathBuf> {
        self.embedding.vectors_path.as_deref().map(expand)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.image_scale.target_size, 600);
        assert_eq!(config.image_scale.max_size, 1000);
        assert_eq!(config.embedding.dim, 300);
        assert_eq!(config.annotations.self_relations, SelfRelationPolicy::Reject);
        assert!(config.embedding.vectors_path.is_none());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[artifacts]"));
        assert!(toml.contains("preddet.json"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [annotations]
            self_relations = "drop"

            [artifacts]
            pretty = true
            "#,
        )
        .unwrap();
        assert_eq!(config.annotations.self_relations, SelfRelationPolicy::Drop);
        assert!(config.artifacts.pretty);
        assert_eq!(config.artifacts.predicates, "predicates.json");
        assert_eq!(config.dataset.image_extension, "jpg");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\noutput_dir = \"/tmp/relgraph-out\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/relgraph-out"));
    }

    #[test]
    fn test_images_dir_is_under_data_dir() {
        let mut config = Config::default();
        config.general.data_dir = PathBuf::from("/data/gqa");
        assert_eq!(config.images_dir(), PathBuf::from("/data/gqa/images"));
    }
}
