//! Relgraph Core - derives relationship-detection artifacts from scene graphs.
//!
//! Raw per-image scene graphs (objects with boxes, directed named relations)
//! are turned into the files a visual relationship model trains against:
//! unified annotation records, predicate and object vocabularies, index-remapped
//! annotations for predicate detection and predicate classification, word
//! vectors for every label, and conditional predicate probabilities per
//! ordered category pair.
//!
//! # Architecture
//!
//! ```text
//! Scene graphs → Annotations → Vocabularies → Remap (preddet, predcls) → Probabilities
//!                                           ↘ Word vectors
//! ```
//!
//! Every output is an artifact in an [`io::ArtifactStore`]. A run only builds
//! artifacts the store does not hold yet.
//!
//! # Usage
//!
//! ```rust,ignore
//! use relgraph_core::{
//!     AnnotationBuilder, Config, FixedScale, FsArtifactStore, FsSceneGraphLoader,
//!     PipelineOrchestrator,
//! };
//!
//! fn main() -> relgraph_core::Result<()> {
//!     let config = Config::load()?;
//!     let loader = FsSceneGraphLoader::from_config(&config);
//!     let scale = FixedScale(1.0);
//!     let store = FsArtifactStore::new(config.output_dir(), config.artifacts.clone());
//!
//!     let mut pipeline = PipelineOrchestrator::new(
//!         store,
//!         &loader,
//!         AnnotationBuilder::from_config(&scale, &config),
//!     );
//!     let report = pipeline.run()?;
//!     println!("{} artifacts built", report.count(relgraph_core::Outcome::Built));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, LabelKind, PipelineError, PipelineResult, RelgraphError, Result};
pub use io::{
    ArtifactStore, Embedder, FixedScale, FsArtifactStore, FsSceneGraphLoader, ImageHeaderScale,
    ImageScale, MemoryArtifactStore, RawCorpus, SceneGraphLoader, TextVectorFile,
};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{
    AnnotationBuilder, Artifact, ArtifactGraph, ArtifactStatus, LabelRemapper, Outcome,
    PipelineOrchestrator, ProbabilityEstimator, ProbabilityTable, RemappedAnnotationSet,
    RunReport, Vocabulary, VocabularyExtractor, WordVectorBuilder, WordVectorTable,
};
pub use types::{
    convert_box, AnnotationRecord, BoundingBox, RawSceneGraph, RemappedAnnotationRecord, Split,
    TaskMode,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
