//! Raw scene-graph loading.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{RawSceneGraph, Split};

/// Supplies the raw scene graphs of a split.
pub trait SceneGraphLoader {
    fn load(&self, split: Split) -> PipelineResult<RawSceneGraph>;
}

/// Reads the per-split scene-graph JSON files under the data directory.
pub struct FsSceneGraphLoader {
    train_path: PathBuf,
    val_path: PathBuf,
}

impl FsSceneGraphLoader {
    pub fn new(train_path: PathBuf, val_path: PathBuf) -> Self {
        Self {
            train_path,
            val_path,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let data_dir = config.data_dir();
        Self::new(
            data_dir.join(&config.dataset.train_scene_graphs),
            data_dir.join(&config.dataset.val_scene_graphs),
        )
    }
}

impl SceneGraphLoader for FsSceneGraphLoader {
    fn load(&self, split: Split) -> PipelineResult<RawSceneGraph> {
        let path = match split {
            Split::Train => &self.train_path,
            Split::Val => &self.val_path,
            Split::Test => {
                return Err(PipelineError::MissingPrerequisite {
                    stage: "load".to_string(),
                    prerequisite: "test split scene graphs are not published".to_string(),
                })
            }
        };

        let start = std::time::Instant::now();
        let file = File::open(path).map_err(|e| PipelineError::SceneGraphLoad {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let graphs: RawSceneGraph = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            PipelineError::SceneGraphLoad {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;

        tracing::info!(
            "Loaded {} {} scene graphs from {:?} in {:?}",
            graphs.len(),
            split,
            path,
            start.elapsed()
        );
        Ok(graphs)
    }
}

/// Scene graphs already held in memory.
#[derive(Debug, Clone, Default)]
pub struct RawCorpus {
    pub train: RawSceneGraph,
    pub val: RawSceneGraph,
}

impl SceneGraphLoader for RawCorpus {
    fn load(&self, split: Split) -> PipelineResult<RawSceneGraph> {
        match split {
            Split::Train => Ok(self.train.clone()),
            Split::Val => Ok(self.val.clone()),
            Split::Test => Ok(RawSceneGraph::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAIN: &str = r#"{
        "2370799": {"width": 500, "height": 333, "objects": {
            "1": {"name": "dog", "x": 0, "y": 0, "w": 5, "h": 10,
                  "relations": [{"name": "wearing", "object": "2"}]},
            "2": {"name": "leash", "x": 5, "y": 5, "w": 3, "h": 10, "relations": []}
        }}
    }"#;

    #[test]
    fn test_fs_loader_reads_splits() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("train.json");
        let val = dir.path().join("val.json");
        std::fs::write(&train, TRAIN).unwrap();
        std::fs::write(&val, "{}").unwrap();

        let loader = FsSceneGraphLoader::new(train, val);
        let graphs = loader.load(Split::Train).unwrap();
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs["2370799"].objects["1"].relations[0].object, "2");
        assert!(loader.load(Split::Val).unwrap().is_empty());
    }

    #[test]
    fn test_fs_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsSceneGraphLoader::new(dir.path().join("a.json"), dir.path().join("b.json"));
        let err = loader.load(Split::Train).unwrap_err();
        assert!(matches!(err, PipelineError::SceneGraphLoad { .. }));
    }

    #[test]
    fn test_fs_loader_rejects_test_split() {
        let loader = FsSceneGraphLoader::new(PathBuf::new(), PathBuf::new());
        let err = loader.load(Split::Test).unwrap_err();
        assert!(matches!(err, PipelineError::MissingPrerequisite { .. }));
    }

    #[test]
    fn test_from_config_joins_data_dir() {
        let mut config = Config::default();
        config.general.data_dir = PathBuf::from("/data/gqa");
        let loader = FsSceneGraphLoader::from_config(&config);
        assert_eq!(
            loader.train_path,
            PathBuf::from("/data/gqa/sceneGraphs/train_sceneGraphs.json")
        );
    }
}
