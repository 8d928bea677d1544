//! Pipeline orchestration - sequences the stages against an artifact store.
//!
//! Every artifact is skipped or rebuilt on its own. The unified annotation
//! corpus is only built when some absent artifact needs it, and vocabularies
//! already in the store are loaded and used as-is so indices stay stable.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::io::{ArtifactStore, Embedder, SceneGraphLoader};
use crate::types::{AnnotationRecord, TaskMode};

use super::annotations::AnnotationBuilder;
use super::graph::{Artifact, ArtifactGraph};
use super::probability::ProbabilityEstimator;
use super::remap::{LabelRemapper, RemappedAnnotationSet};
use super::vocabulary::{Vocabulary, VocabularyExtractor};
use super::word_vectors::WordVectorBuilder;

/// What a run did with one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Already in the store.
    Skipped,
    Built,
    /// Could not be built and nothing depends on it.
    Unavailable,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Outcome::Skipped => "skipped",
            Outcome::Built => "built",
            Outcome::Unavailable => "unavailable",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    pub artifact: Artifact,
    pub outcome: Outcome,
}

/// Per-artifact outcomes of one run, in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub artifacts: Vec<ArtifactOutcome>,
}

impl RunReport {
    fn record(&mut self, artifact: Artifact, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => tracing::debug!("Skipping {} (already present)", artifact),
            Outcome::Unavailable => tracing::debug!("Skipping {} (unavailable)", artifact),
            Outcome::Built => {}
        }
        self.artifacts.push(ArtifactOutcome { artifact, outcome });
    }

    pub fn outcome(&self, artifact: Artifact) -> Option<Outcome> {
        self.artifacts
            .iter()
            .find(|a| a.artifact == artifact)
            .map(|a| a.outcome)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.artifacts.iter().filter(|a| a.outcome == outcome).count()
    }

    /// True if nothing was rebuilt.
    pub fn is_noop(&self) -> bool {
        self.count(Outcome::Built) == 0
    }
}

/// Drives annotation building, vocabulary extraction, word vectors,
/// remapping and probability estimation.
pub struct PipelineOrchestrator<'a, S: ArtifactStore> {
    store: S,
    loader: &'a dyn SceneGraphLoader,
    builder: AnnotationBuilder<'a>,
    embedder: Option<&'a dyn Embedder>,
}

impl<'a, S: ArtifactStore> PipelineOrchestrator<'a, S> {
    pub fn new(store: S, loader: &'a dyn SceneGraphLoader, builder: AnnotationBuilder<'a>) -> Self {
        Self {
            store,
            loader,
            builder,
            embedder: None,
        }
    }

    /// Enable the word-vector artifact.
    pub fn with_embedder(mut self, embedder: &'a dyn Embedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Bring every artifact up to date.
    ///
    /// Stops at the first error. Artifacts persisted before the error stay in
    /// the store and are skipped by the next run.
    pub fn run(&mut self) -> PipelineResult<RunReport> {
        let start = std::time::Instant::now();
        let mut graph = ArtifactGraph::from_store(&self.store);
        let mut report = RunReport::default();
        let mut unified: Option<Vec<AnnotationRecord>> = None;

        tracing::info!(
            "Pipeline: {} of {} artifacts to build",
            graph.pending().len(),
            Artifact::ALL.len()
        );

        // Vocabularies
        let (predicates, objects) = self.vocabularies(&mut graph, &mut report, &mut unified)?;

        // Word vectors
        let artifact = Artifact::WordVectors;
        if graph.is_ready(artifact) {
            report.record(artifact, Outcome::Skipped);
        } else if let Some(embedder) = self.embedder {
            graph.begin(artifact)?;
            let table = WordVectorBuilder::build(&predicates, &objects, embedder)?;
            self.store.persist(artifact, &table)?;
            graph.finish(artifact);
            report.record(artifact, Outcome::Built);
        } else {
            report.record(artifact, Outcome::Unavailable);
        }

        // Remapped annotations
        let mut sets: HashMap<TaskMode, RemappedAnnotationSet> = HashMap::new();
        for mode in [TaskMode::Detection, TaskMode::Classification] {
            let artifact = Artifact::annotations(mode);
            if graph.is_ready(artifact) {
                report.record(artifact, Outcome::Skipped);
                continue;
            }
            graph.begin(artifact)?;
            let records = self.unified(&mut unified)?;
            let set = LabelRemapper::remap_set(records, &predicates, &objects, mode)?;
            self.store.persist(artifact, &set)?;
            graph.finish(artifact);
            report.record(artifact, Outcome::Built);
            sets.insert(mode, set);
        }

        // Probability tables
        for mode in [TaskMode::Detection, TaskMode::Classification] {
            let artifact = Artifact::probabilities(mode);
            if graph.is_ready(artifact) {
                report.record(artifact, Outcome::Skipped);
                continue;
            }
            graph.begin(artifact)?;
            let set = match sets.remove(&mode) {
                Some(set) => set,
                None => self
                    .store
                    .load::<RemappedAnnotationSet>(Artifact::annotations(mode))?,
            };
            set.check_vocabularies(&predicates, &objects)?;
            let table = ProbabilityEstimator::estimate(
                &set.records,
                &predicates,
                &objects,
                mode.with_background(),
            )?;
            self.store.persist(artifact, &table)?;
            graph.finish(artifact);
            report.record(artifact, Outcome::Built);
        }

        tracing::info!(
            "Pipeline finished in {:?}: {} built, {} skipped, {} unavailable",
            start.elapsed(),
            report.count(Outcome::Built),
            report.count(Outcome::Skipped),
            report.count(Outcome::Unavailable)
        );
        Ok(report)
    }

    /// Load stored vocabularies, extracting any that are missing.
    fn vocabularies(
        &mut self,
        graph: &mut ArtifactGraph,
        report: &mut RunReport,
        unified: &mut Option<Vec<AnnotationRecord>>,
    ) -> PipelineResult<(Vocabulary, Vocabulary)> {
        let extracted = if graph.is_ready(Artifact::Predicates) && graph.is_ready(Artifact::Objects)
        {
            None
        } else {
            Some(VocabularyExtractor::extract(self.unified(unified)?))
        };
        let (fresh_predicates, fresh_objects) = match extracted {
            Some((p, o)) => (Some(p), Some(o)),
            None => (None, None),
        };

        let predicates =
            self.vocabulary(Artifact::Predicates, fresh_predicates, graph, report)?;
        let objects = self.vocabulary(Artifact::Objects, fresh_objects, graph, report)?;
        Ok((predicates, objects))
    }

    fn vocabulary(
        &mut self,
        artifact: Artifact,
        fresh: Option<Vocabulary>,
        graph: &mut ArtifactGraph,
        report: &mut RunReport,
    ) -> PipelineResult<Vocabulary> {
        if graph.is_ready(artifact) {
            let vocab: Vocabulary = self.store.load(artifact)?;
            report.record(artifact, Outcome::Skipped);
            return Ok(vocab);
        }
        graph.begin(artifact)?;
        let vocab = fresh.unwrap_or_default();
        self.store.persist(artifact, &vocab)?;
        graph.finish(artifact);
        report.record(artifact, Outcome::Built);
        Ok(vocab)
    }

    /// The unified train+val corpus, built on first use.
    fn unified<'c>(
        &self,
        cache: &'c mut Option<Vec<AnnotationRecord>>,
    ) -> PipelineResult<&'c [AnnotationRecord]> {
        let records = match cache.take() {
            Some(records) => records,
            None => self.builder.build_corpus(self.loader)?,
        };
        Ok(cache.insert(records))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use super::*;
    use crate::error::PipelineError;
    use crate::io::{FixedScale, MemoryArtifactStore, RawCorpus};
    use crate::pipeline::probability::ProbabilityTable;
    use crate::pipeline::word_vectors::WordVectorTable;
    use crate::types::{RawSceneGraph, Split};
    use approx::assert_relative_eq;

    const DOG_LEASH: &str = r#"{
        "1": {"width": 20, "height": 20, "objects": {
            "10": {"name": "dog", "x": 0, "y": 0, "w": 5, "h": 10,
                   "relations": [{"name": "wearing", "object": "11"}]},
            "11": {"name": "leash", "x": 5, "y": 5, "w": 3, "h": 10, "relations": []}
        }}
    }"#;

    /// Counts how often each split is loaded.
    struct CountingLoader {
        corpus: RawCorpus,
        loads: Cell<usize>,
    }

    impl CountingLoader {
        fn new(train: &str) -> Self {
            Self {
                corpus: RawCorpus {
                    train: serde_json::from_str(train).unwrap(),
                    val: RawSceneGraph::new(),
                },
                loads: Cell::new(0),
            }
        }
    }

    impl SceneGraphLoader for CountingLoader {
        fn load(&self, split: Split) -> PipelineResult<RawSceneGraph> {
            self.loads.set(self.loads.get() + 1);
            self.corpus.load(split)
        }
    }

    fn run(
        store: MemoryArtifactStore,
        loader: &dyn SceneGraphLoader,
    ) -> (PipelineResult<RunReport>, MemoryArtifactStore) {
        let scale = FixedScale(1.0);
        let mut orchestrator =
            PipelineOrchestrator::new(store, loader, AnnotationBuilder::new(&scale));
        let report = orchestrator.run();
        (report, orchestrator.into_store())
    }

    fn snapshot(store: &MemoryArtifactStore) -> Vec<Option<serde_json::Value>> {
        Artifact::ALL
            .iter()
            .map(|a| store.get(*a).cloned())
            .collect()
    }

    #[test]
    fn test_end_to_end_dog_leash() {
        let loader = CountingLoader::new(DOG_LEASH);
        let (report, store) = run(MemoryArtifactStore::new(), &loader);
        let report = report.unwrap();

        assert_eq!(report.count(Outcome::Built), 6);
        assert_eq!(
            report.outcome(Artifact::WordVectors),
            Some(Outcome::Unavailable)
        );

        let predicates: Vocabulary = store.load(Artifact::Predicates).unwrap();
        let objects: Vocabulary = store.load(Artifact::Objects).unwrap();
        assert_eq!(predicates.labels(), ["wearing"]);
        assert_eq!(objects.labels(), ["dog", "leash"]);

        let preddet: RemappedAnnotationSet = store.load(Artifact::PreddetAnnotations).unwrap();
        assert_eq!(preddet.mode, TaskMode::Detection);
        let rec = &preddet.records[0];
        assert_eq!(rec.objects.names, vec![0, 1]);
        assert_eq!(rec.objects.boxes[0].to_array(), [0, 10, 0, 5]);
        assert_eq!(rec.objects.boxes[1].to_array(), [5, 15, 5, 8]);
        assert_eq!(rec.relations.subj_ids, vec![0]);
        assert_eq!(rec.relations.obj_ids, vec![1]);

        let predcls: RemappedAnnotationSet = store.load(Artifact::PredclsAnnotations).unwrap();
        assert_eq!(predcls.background_label, Some(1));
        assert_eq!(predcls.records, preddet.records);

        let det: ProbabilityTable = store.load(Artifact::PreddetProbabilities).unwrap();
        assert_relative_eq!(det.get(0, 1, 0).unwrap(), 1.0);
        assert_eq!(det.row(1, 0).sum(), 0.0);

        let cls: ProbabilityTable = store.load(Artifact::PredclsProbabilities).unwrap();
        assert_relative_eq!(cls.get(0, 1, 0).unwrap(), 1.0);
        assert_relative_eq!(cls.background(1, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_second_run_is_noop() {
        let loader = CountingLoader::new(DOG_LEASH);
        let (first, store) = run(MemoryArtifactStore::new(), &loader);
        assert!(!first.unwrap().is_noop());
        let persisted = store.persist_count();
        let before = snapshot(&store);
        let loads = loader.loads.get();

        let (second, store) = run(store, &loader);
        let second = second.unwrap();
        assert!(second.is_noop());
        assert_eq!(second.count(Outcome::Skipped), 6);
        assert_eq!(store.persist_count(), persisted);
        assert_eq!(snapshot(&store), before);
        // Nothing needed the raw corpus.
        assert_eq!(loader.loads.get(), loads);
    }

    #[test]
    fn test_rebuilds_only_the_missing_artifact() {
        let loader = CountingLoader::new(DOG_LEASH);
        let (_, mut store) = run(MemoryArtifactStore::new(), &loader);
        let before = snapshot(&store);
        let persisted = store.persist_count();

        store.remove(Artifact::PredclsProbabilities);
        let (report, store) = run(store, &loader);
        let report = report.unwrap();

        assert_eq!(report.count(Outcome::Built), 1);
        assert_eq!(
            report.outcome(Artifact::PredclsProbabilities),
            Some(Outcome::Built)
        );
        assert_eq!(store.persist_count(), persisted + 1);
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn test_missing_annotations_rebuilt_from_stored_vocabulary() {
        let loader = CountingLoader::new(DOG_LEASH);
        let (_, mut store) = run(MemoryArtifactStore::new(), &loader);
        let before = snapshot(&store);

        store.remove(Artifact::PreddetAnnotations);
        let loads = loader.loads.get();
        let (report, store) = run(store, &loader);
        let report = report.unwrap();

        assert_eq!(
            report.outcome(Artifact::PreddetAnnotations),
            Some(Outcome::Built)
        );
        assert_eq!(
            report.outcome(Artifact::PreddetProbabilities),
            Some(Outcome::Skipped)
        );
        assert!(loader.loads.get() > loads);
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn test_error_leaves_earlier_artifacts() {
        let loader = CountingLoader::new(DOG_LEASH);
        let mut store = MemoryArtifactStore::new();
        store.persist(Artifact::Predicates, &vec!["on"]).unwrap();

        let (report, store) = run(store, &loader);
        let err = report.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownLabel { .. }));
        assert!(err.to_string().contains("wearing"));

        // Objects were extracted and written before remapping failed.
        assert!(store.exists(Artifact::Objects));
        assert!(!store.exists(Artifact::PreddetAnnotations));
        let predicates: Vec<String> = store.load(Artifact::Predicates).unwrap();
        assert_eq!(predicates, vec!["on"]);
    }

    #[test]
    fn test_malformed_corpus_writes_nothing() {
        let loader = CountingLoader::new(
            r#"{"s": {"width": 9, "height": 9, "objects": {
                "a": {"name": "cup", "x": 0, "y": 0, "w": 1, "h": 1,
                      "relations": [{"name": "on", "object": "ghost"}]}
            }}}"#,
        );
        let (report, store) = run(MemoryArtifactStore::new(), &loader);
        assert!(matches!(
            report.unwrap_err(),
            PipelineError::MalformedAnnotation { .. }
        ));
        assert_eq!(store.persist_count(), 0);
    }

    #[test]
    fn test_stale_annotations_are_reported() {
        let loader = CountingLoader::new(DOG_LEASH);
        let (_, mut store) = run(MemoryArtifactStore::new(), &loader);

        store.persist(Artifact::Objects, &vec!["leash", "dog"]).unwrap();
        store.remove(Artifact::PreddetProbabilities);
        let (report, _) = run(store, &loader);
        assert!(matches!(
            report.unwrap_err(),
            PipelineError::StaleArtifact { .. }
        ));
    }

    #[test]
    fn test_word_vectors_with_embedder() {
        struct Unit;
        impl Embedder for Unit {
            fn dim(&self) -> usize {
                2
            }
            fn embed(&self, tokens: &[String]) -> PipelineResult<HashMap<String, Vec<f32>>> {
                Ok(tokens
                    .iter()
                    .filter(|t| t.as_str() != "leash")
                    .map(|t| (t.clone(), vec![1.0, 0.0]))
                    .collect())
            }
        }

        let loader = CountingLoader::new(DOG_LEASH);
        let scale = FixedScale(1.0);
        let embedder = Unit;
        let mut orchestrator = PipelineOrchestrator::new(
            MemoryArtifactStore::new(),
            &loader,
            AnnotationBuilder::new(&scale),
        )
        .with_embedder(&embedder);
        let report = orchestrator.run().unwrap();
        assert_eq!(report.outcome(Artifact::WordVectors), Some(Outcome::Built));

        let table: WordVectorTable = orchestrator.store().load(Artifact::WordVectors).unwrap();
        assert_eq!(table.predicates["wearing"], vec![1.0, 0.0]);
        assert_eq!(table.objects["dog"], vec![1.0, 0.0]);
        assert_eq!(table.objects["leash"], vec![0.0, 0.0]);
    }
}
