//! Annotation derivation pipeline.
//!
//! Stages, in dependency order:
//! - **annotations**: Raw scene graphs to unified annotation records
//! - **vocabulary**: Predicate and object vocabularies
//! - **word_vectors**: Per-label word vectors
//! - **remap**: Names to vocabulary indices, per task mode
//! - **probability**: Predicate probabilities per category pair
//! - **graph**: Artifact dependencies and status
//! - **orchestrator**: Runs the stages against an artifact store

pub mod annotations;
pub mod graph;
pub mod orchestrator;
pub mod probability;
pub mod remap;
pub mod vocabulary;
pub mod word_vectors;

pub use annotations::AnnotationBuilder;
pub use graph::{Artifact, ArtifactGraph, ArtifactStatus};
pub use orchestrator::{ArtifactOutcome, Outcome, PipelineOrchestrator, RunReport};
pub use probability::{ProbabilityEstimator, ProbabilityTable};
pub use remap::{LabelRemapper, RemappedAnnotationSet};
pub use vocabulary::{Vocabulary, VocabularyExtractor};
pub use word_vectors::{WordVectorBuilder, WordVectorTable};
