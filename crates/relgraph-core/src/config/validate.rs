//! Configuration validation with range checks.

use std::collections::HashSet;

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_scale.target_size == 0 {
            return Err(ConfigError::ValidationError(
                "image_scale.target_size must be > 0".into(),
            ));
        }
        if self.image_scale.max_size < self.image_scale.target_size {
            return Err(ConfigError::ValidationError(
                "image_scale.max_size must be >= image_scale.target_size".into(),
            ));
        }
        if self.embedding.dim == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dim must be > 0".into(),
            ));
        }
        if self.dataset.image_extension.is_empty() {
            return Err(ConfigError::ValidationError(
                "dataset.image_extension must not be empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        for name in self.artifacts.file_names() {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "artifacts file names must not be empty".into(),
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "artifacts file name '{name}' is used twice"
                )));
            }
        }
        Ok(())
    }
}
