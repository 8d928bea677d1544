//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root of the raw scene-graph corpus
    pub data_dir: PathBuf,

    /// Directory the derived artifacts are written to
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.relgraph/gqa"),
            output_dir: PathBuf::from("~/.relgraph/artifacts"),
        }
    }
}

/// Raw dataset layout, relative to `general.data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Train split scene graphs
    pub train_scene_graphs: PathBuf,

    /// Validation split scene graphs
    pub val_scene_graphs: PathBuf,

    /// Directory holding the images referenced by scene id
    pub images_dir: PathBuf,

    /// Extension appended to a scene id to form its filename
    pub image_extension: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            train_scene_graphs: PathBuf::from("sceneGraphs/train_sceneGraphs.json"),
            val_scene_graphs: PathBuf::from("sceneGraphs/val_sceneGraphs.json"),
            images_dir: PathBuf::from("images"),
            image_extension: "jpg".to_string(),
        }
    }
}

/// How relations whose subject and target are the same object are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfRelationPolicy {
    /// Fail the build with `PipelineError::SelfRelation`
    #[default]
    Reject,
    /// Discard the relation and log a warning
    Drop,
    /// Emit the relation unchanged
    Keep,
}

/// Annotation building settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Policy for self-relations
    pub self_relations: SelfRelationPolicy,
}

/// Image resize factor settings (`im_scale`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageScaleConfig {
    /// Read image headers to compute the scale; when false every image gets 1.0
    pub enabled: bool,

    /// Target length of the shorter image side
    pub target_size: u32,

    /// Cap on the longer image side after scaling
    pub max_size: u32,
}

impl Default for ImageScaleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_size: 600,
            max_size: 1000,
        }
    }
}

/// Word-vector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// word2vec/GloVe text file; the word-vector artifact is skipped when unset
    pub vectors_path: Option<PathBuf>,

    /// Expected vector dimension
    pub dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            vectors_path: None,
            dim: 300,
        }
    }
}

/// Artifact file names, relative to `general.output_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Predicate-detection annotations
    pub preddet: String,

    /// Predicate-classification annotations
    pub predcls: String,

    /// Predicate vocabulary
    pub predicates: String,

    /// Object vocabulary
    pub objects: String,

    /// Word-vector table
    pub word2vec: String,

    /// Foreground-only probability table
    pub preddet_probabilities: String,

    /// Background-inclusive probability table
    pub predcls_probabilities: String,

    /// Pretty-print JSON artifacts
    pub pretty: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            preddet: "preddet.json".to_string(),
            predcls: "predcls.json".to_string(),
            predicates: "predicates.json".to_string(),
            objects: "objects.json".to_string(),
            word2vec: "word2vec.json".to_string(),
            preddet_probabilities: "preddet_probabilities.json".to_string(),
            predcls_probabilities: "predcls_probabilities.json".to_string(),
            pretty: false,
        }
    }
}

impl ArtifactsConfig {
    /// All configured file names, in artifact order.
    pub fn file_names(&self) -> [&str; 7] {
        [
            &self.preddet,
            &self.predcls,
            &self.predicates,
            &self.objects,
            &self.word2vec,
            &self.preddet_probabilities,
            &self.predcls_probabilities,
        ]
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
