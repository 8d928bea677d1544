//! Error types for the relgraph derivation pipeline.
//!
//! Errors are organized by stage so a failed run names the scene, label or
//! artifact that stopped it. Every pipeline error is a deterministic function
//! of the input, so nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for relgraph operations.
#[derive(Error, Debug)]
pub enum RelgraphError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Which vocabulary a label was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Object,
    Predicate,
}

impl std::fmt::Display for LabelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelKind::Object => write!(f, "object"),
            LabelKind::Predicate => write!(f, "predicate"),
        }
    }
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A scene or record violates the annotation invariants
    #[error("Malformed annotation in {scene}: {message}")]
    MalformedAnnotation { scene: String, message: String },

    /// A name was not found in the vocabulary it is remapped against
    #[error("Unknown {kind} label '{label}'")]
    UnknownLabel { kind: LabelKind, label: String },

    /// A stage ran without an input it depends on
    #[error("Stage '{stage}' is missing its prerequisite: {prerequisite}")]
    MissingPrerequisite { stage: String, prerequisite: String },

    /// A relation points from an object to itself
    #[error("Self-relation on object '{object}' in {scene}")]
    SelfRelation { scene: String, object: String },

    /// A persisted artifact was derived from a different vocabulary
    #[error("Stale artifact {name}: {message}")]
    StaleArtifact { name: String, message: String },

    /// Image scale lookup failed
    #[error("Image scale failed for {filename}: {message}")]
    ImageScale { filename: String, message: String },

    /// Reading or writing a persisted artifact failed
    #[error("Artifact error for {name}: {message}")]
    Artifact { name: String, message: String },

    /// Raw scene graph file could not be read or parsed
    #[error("Failed to load scene graphs from {}: {message}", path.display())]
    SceneGraphLoad { path: PathBuf, message: String },

    /// Word-vector lookup failed
    #[error("Embedding error: {message}")]
    Embedding { message: String },
}

/// Convenience type alias for relgraph results.
pub type Result<T> = std::result::Result<T, RelgraphError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_label_message_names_kind() {
        let err = PipelineError::UnknownLabel {
            kind: LabelKind::Predicate,
            label: "riding".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown predicate label 'riding'");
    }

    #[test]
    fn test_pipeline_error_converts_to_top_level() {
        let err: RelgraphError = PipelineError::MissingPrerequisite {
            stage: "estimate".to_string(),
            prerequisite: "preddet annotations".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("Pipeline error:"));
        assert!(err.to_string().contains("preddet annotations"));
    }
}
