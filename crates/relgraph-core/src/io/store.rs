//! Artifact persistence.
//!
//! The orchestrator only ever asks three questions of storage: does an
//! artifact exist, load it, persist it. Both implementations speak JSON.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ArtifactsConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::output::{OutputFormat, OutputWriter};
use crate::pipeline::graph::Artifact;

/// Existence-checked storage for pipeline artifacts.
pub trait ArtifactStore {
    fn exists(&self, artifact: Artifact) -> bool;

    fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> PipelineResult<T>;

    fn persist<T: Serialize>(&mut self, artifact: Artifact, value: &T) -> PipelineResult<()>;
}

fn artifact_error(artifact: Artifact, message: impl Into<String>) -> PipelineError {
    PipelineError::Artifact {
        name: artifact.name().to_string(),
        message: message.into(),
    }
}

/// One JSON file per artifact inside an output directory.
pub struct FsArtifactStore {
    dir: PathBuf,
    names: ArtifactsConfig,
}

impl FsArtifactStore {
    pub fn new(dir: PathBuf, names: ArtifactsConfig) -> Self {
        Self { dir, names }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File an artifact is stored in.
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        let name = match artifact {
            Artifact::PreddetAnnotations => &self.names.preddet,
            Artifact::PredclsAnnotations => &self.names.predcls,
            Artifact::Predicates => &self.names.predicates,
            Artifact::Objects => &self.names.objects,
            Artifact::WordVectors => &self.names.word2vec,
            Artifact::PreddetProbabilities => &self.names.preddet_probabilities,
            Artifact::PredclsProbabilities => &self.names.predcls_probabilities,
        };
        self.dir.join(name)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> PipelineResult<T> {
        let path = self.path(artifact);
        let file = File::open(&path)
            .map_err(|e| artifact_error(artifact, format!("cannot open {:?}: {}", path, e)))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| artifact_error(artifact, format!("cannot parse {:?}: {}", path, e)))
    }

    fn persist<T: Serialize>(&mut self, artifact: Artifact, value: &T) -> PipelineResult<()> {
        let path = self.path(artifact);
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            artifact_error(artifact, format!("cannot create {:?}: {}", self.dir, e))
        })?;

        // Written beside the target and renamed, so an interrupted write never
        // passes a later existence check.
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).map_err(|e| {
                artifact_error(artifact, format!("cannot create {:?}: {}", tmp, e))
            })?;
            let mut writer =
                OutputWriter::new(BufWriter::new(file), OutputFormat::Json, self.names.pretty);
            writer
                .write(value)
                .and_then(|_| writer.flush())
                .map_err(|e| artifact_error(artifact, format!("cannot write {:?}: {}", tmp, e)))?;
        }
        std::fs::rename(&tmp, &path)
            .map_err(|e| artifact_error(artifact, format!("cannot move into {:?}: {}", path, e)))?;

        tracing::debug!("Wrote {} to {:?}", artifact, path);
        Ok(())
    }
}

/// In-memory store for exercising the pipeline without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    values: HashMap<Artifact, serde_json::Value>,
    persist_count: usize,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of persist calls so far.
    pub fn persist_count(&self) -> usize {
        self.persist_count
    }

    /// Raw JSON of a stored artifact.
    pub fn get(&self, artifact: Artifact) -> Option<&serde_json::Value> {
        self.values.get(&artifact)
    }

    pub fn remove(&mut self, artifact: Artifact) -> Option<serde_json::Value> {
        self.values.remove(&artifact)
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn exists(&self, artifact: Artifact) -> bool {
        self.values.contains_key(&artifact)
    }

    fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> PipelineResult<T> {
        let value = self
            .values
            .get(&artifact)
            .ok_or_else(|| artifact_error(artifact, "not stored"))?;
        serde_json::from_value(value.clone()).map_err(|e| artifact_error(artifact, e.to_string()))
    }

    fn persist<T: Serialize>(&mut self, artifact: Artifact, value: &T) -> PipelineResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| artifact_error(artifact, e.to_string()))?;
        self.values.insert(artifact, value);
        self.persist_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsArtifactStore::new(dir.path().join("out"), ArtifactsConfig::default());
        assert!(!store.exists(Artifact::Predicates));

        store
            .persist(Artifact::Predicates, &vec!["on", "wearing"])
            .unwrap();
        assert!(store.exists(Artifact::Predicates));
        assert_eq!(
            store.path(Artifact::Predicates),
            dir.path().join("out").join("predicates.json")
        );
        assert!(!store.path(Artifact::Predicates).with_extension("json.tmp").exists());

        let loaded: Vec<String> = store.load(Artifact::Predicates).unwrap();
        assert_eq!(loaded, vec!["on", "wearing"]);
    }

    #[test]
    fn test_fs_store_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let names = ArtifactsConfig {
            pretty: true,
            ..ArtifactsConfig::default()
        };
        let mut store = FsArtifactStore::new(dir.path().to_path_buf(), names);
        store.persist(Artifact::Objects, &vec!["dog"]).unwrap();
        let text = std::fs::read_to_string(store.path(Artifact::Objects)).unwrap();
        assert!(text.contains("\n  \"dog\""));
    }

    #[test]
    fn test_fs_store_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().to_path_buf(), ArtifactsConfig::default());
        let err = store.load::<Vec<String>>(Artifact::Objects).unwrap_err();
        assert!(err.to_string().contains("objects"));
    }

    #[test]
    fn test_fs_store_load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().to_path_buf(), ArtifactsConfig::default());
        std::fs::write(store.path(Artifact::Objects), "[\"dog\"").unwrap();
        let err = store.load::<Vec<String>>(Artifact::Objects).unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }

    #[test]
    fn test_memory_store_counts_persists() {
        let mut store = MemoryArtifactStore::new();
        store.persist(Artifact::Objects, &vec!["dog"]).unwrap();
        store.persist(Artifact::Objects, &vec!["cat"]).unwrap();
        assert_eq!(store.persist_count(), 2);

        let loaded: Vec<String> = store.load(Artifact::Objects).unwrap();
        assert_eq!(loaded, vec!["cat"]);
        assert!(store.load::<Vec<String>>(Artifact::Predicates).is_err());
    }
}
