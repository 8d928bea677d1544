//! Collaborators the pipeline calls into: scene-graph loading, image scale
//! lookup, artifact storage and word vectors.

pub mod loader;
pub mod scale;
pub mod store;
pub mod vectors;

pub use loader::{FsSceneGraphLoader, RawCorpus, SceneGraphLoader};
pub use scale::{FixedScale, ImageHeaderScale, ImageScale};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
pub use vectors::{Embedder, TextVectorFile};
