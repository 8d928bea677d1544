//! Artifact dependency graph.
//!
//! Each artifact carries a status seeded from the store. A stage may only
//! start building an artifact once every prerequisite is ready.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::io::ArtifactStore;
use crate::types::TaskMode;

/// The persisted outputs of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Predicates,
    Objects,
    #[serde(rename = "word2vec")]
    WordVectors,
    #[serde(rename = "preddet")]
    PreddetAnnotations,
    #[serde(rename = "predcls")]
    PredclsAnnotations,
    PreddetProbabilities,
    PredclsProbabilities,
}

impl Artifact {
    /// Every artifact, in dependency order.
    pub const ALL: [Artifact; 7] = [
        Artifact::Predicates,
        Artifact::Objects,
        Artifact::WordVectors,
        Artifact::PreddetAnnotations,
        Artifact::PredclsAnnotations,
        Artifact::PreddetProbabilities,
        Artifact::PredclsProbabilities,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::Predicates => "predicates",
            Artifact::Objects => "objects",
            Artifact::WordVectors => "word2vec",
            Artifact::PreddetAnnotations => "preddet",
            Artifact::PredclsAnnotations => "predcls",
            Artifact::PreddetProbabilities => "preddet_probabilities",
            Artifact::PredclsProbabilities => "predcls_probabilities",
        }
    }

    /// Remapped annotation set for a task mode.
    pub fn annotations(mode: TaskMode) -> Self {
        match mode {
            TaskMode::Detection => Artifact::PreddetAnnotations,
            TaskMode::Classification => Artifact::PredclsAnnotations,
        }
    }

    /// Probability table for a task mode.
    pub fn probabilities(mode: TaskMode) -> Self {
        match mode {
            TaskMode::Detection => Artifact::PreddetProbabilities,
            TaskMode::Classification => Artifact::PredclsProbabilities,
        }
    }

    /// Artifacts that must be ready before this one can be built.
    ///
    /// The vocabularies depend only on the unified annotations, which are
    /// rebuilt in memory on demand and never persisted.
    pub fn prerequisites(self) -> &'static [Artifact] {
        match self {
            Artifact::Predicates | Artifact::Objects => &[],
            Artifact::WordVectors
            | Artifact::PreddetAnnotations
            | Artifact::PredclsAnnotations => &[Artifact::Predicates, Artifact::Objects],
            Artifact::PreddetProbabilities => &[
                Artifact::PreddetAnnotations,
                Artifact::Predicates,
                Artifact::Objects,
            ],
            Artifact::PredclsProbabilities => &[
                Artifact::PredclsAnnotations,
                Artifact::Predicates,
                Artifact::Objects,
            ],
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl std::str::FromStr for Artifact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Artifact::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown artifact '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Absent,
    Building,
    Ready,
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ArtifactStatus::Absent => "absent",
            ArtifactStatus::Building => "building",
            ArtifactStatus::Ready => "ready",
        })
    }
}

/// Per-artifact status for one run.
#[derive(Debug, Clone)]
pub struct ArtifactGraph {
    statuses: BTreeMap<Artifact, ArtifactStatus>,
}

impl ArtifactGraph {
    /// Ready where the store already holds the artifact, absent elsewhere.
    pub fn from_store<S: ArtifactStore + ?Sized>(store: &S) -> Self {
        let statuses = Artifact::ALL
            .into_iter()
            .map(|a| {
                let status = if store.exists(a) {
                    ArtifactStatus::Ready
                } else {
                    ArtifactStatus::Absent
                };
                (a, status)
            })
            .collect();
        Self { statuses }
    }

    pub fn status(&self, artifact: Artifact) -> ArtifactStatus {
        self.statuses
            .get(&artifact)
            .copied()
            .unwrap_or(ArtifactStatus::Absent)
    }

    pub fn is_ready(&self, artifact: Artifact) -> bool {
        self.status(artifact) == ArtifactStatus::Ready
    }

    /// Absent artifacts, in dependency order.
    pub fn pending(&self) -> Vec<Artifact> {
        self.iter()
            .filter(|(_, s)| *s == ArtifactStatus::Absent)
            .map(|(a, _)| a)
            .collect()
    }

    /// Mark `artifact` as building once its prerequisites are ready.
    pub fn begin(&mut self, artifact: Artifact) -> PipelineResult<()> {
        if let Some(missing) = artifact
            .prerequisites()
            .iter()
            .find(|p| !self.is_ready(**p))
        {
            return Err(PipelineError::MissingPrerequisite {
                stage: artifact.name().to_string(),
                prerequisite: missing.name().to_string(),
            });
        }
        self.statuses.insert(artifact, ArtifactStatus::Building);
        Ok(())
    }

    /// Mark `artifact` as persisted.
    pub fn finish(&mut self, artifact: Artifact) {
        self.statuses.insert(artifact, ArtifactStatus::Ready);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Artifact, ArtifactStatus)> + '_ {
        self.statuses.iter().map(|(a, s)| (*a, *s))
    }
}
