//! Core data types for the relgraph derivation pipeline.
//!
//! Raw scene graphs are the GQA-style input; annotation records are the unified
//! per-image format every later stage reads. A record is generic over its label
//! type so the name-keyed and index-keyed variants share one shape.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Raw scene graphs of one split, keyed by scene id in document order.
pub type RawSceneGraph = IndexMap<String, RawScene>;

/// One raw scene: its objects (keyed by object id, in document order) and
/// the image dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawScene {
    pub objects: IndexMap<String, RawObject>,
    pub height: u32,
    pub width: u32,
}

/// A raw object with its top-left anchored box and outgoing relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObject {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    #[serde(default)]
    pub relations: Vec<RawRelation>,
}

/// A raw relation from the owning object to `object`, the target key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRelation {
    pub name: String,
    pub object: String,
}

/// Dataset split, serialized as its integer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    /// Integer id stored in annotation records.
    pub fn id(self) -> u8 {
        match self {
            Split::Train => 0,
            Split::Val => 1,
            Split::Test => 2,
        }
    }
}

impl From<Split> for u8 {
    fn from(split: Split) -> u8 {
        split.id()
    }
}

impl TryFrom<u8> for Split {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Split::Train),
            1 => Ok(Split::Val),
            2 => Ok(Split::Test),
            other => Err(format!("invalid split id {other}")),
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Val => write!(f, "val"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// Box in `[y_min, y_max, x_min, x_max]` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub y_min: i64,
    pub y_max: i64,
    pub x_min: i64,
    pub x_max: i64,
}

impl BoundingBox {
    /// Convert a top-left corner plus width/height box.
    pub fn from_xywh(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            y_min: y,
            y_max: y + h,
            x_min: x,
            x_max: x + w,
        }
    }

    pub fn to_array(self) -> [i64; 4] {
        [self.y_min, self.y_max, self.x_min, self.x_max]
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from([y_min, y_max, x_min, x_max]: [i64; 4]) -> Self {
        Self {
            y_min,
            y_max,
            x_min,
            x_max,
        }
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

/// Convert `(x, y, w, h)` into `[y, y + h, x, x + w]`.
pub fn convert_box(x: i64, y: i64, w: i64, h: i64) -> [i64; 4] {
    BoundingBox::from_xywh(x, y, w, h).to_array()
}

/// Objects of one record: parallel name and box sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotations<L> {
    pub names: Vec<L>,
    pub boxes: Vec<BoundingBox>,
}

/// Relations of one record: parallel predicate, subject and object sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationAnnotations<L> {
    pub names: Vec<L>,
    pub subj_ids: Vec<usize>,
    pub obj_ids: Vec<usize>,
}

/// One image's annotations.
///
/// `L` is `String` for the unified format and `usize` once labels have been
/// remapped to vocabulary indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord<L = String> {
    pub filename: String,
    pub split_id: Split,
    pub height: u32,
    pub width: u32,
    pub im_scale: f64,
    pub objects: ObjectAnnotations<L>,
    pub relations: RelationAnnotations<L>,
}

/// Annotation record with vocabulary indices in place of names.
pub type RemappedAnnotationRecord = AnnotationRecord<usize>;

impl<L> AnnotationRecord<L> {
    /// Number of objects in the record.
    pub fn object_count(&self) -> usize {
        self.objects.names.len()
    }

    /// Number of relations in the record.
    pub fn relation_count(&self) -> usize {
        self.relations.names.len()
    }

    /// Iterate `(subject index, object index, predicate)` triples.
    pub fn relation_triples(&self) -> impl Iterator<Item = (usize, usize, &L)> + '_ {
        self.relations
            .subj_ids
            .iter()
            .zip(&self.relations.obj_ids)
            .zip(&self.relations.names)
            .map(|((&s, &o), p)| (s, o, p))
    }

    /// Check the parallel-sequence and index-range invariants.
    pub fn validate(&self) -> PipelineResult<()> {
        let malformed = |message: String| PipelineError::MalformedAnnotation {
            scene: self.filename.clone(),
            message,
        };

        if self.objects.names.len() != self.objects.boxes.len() {
            return Err(malformed(format!(
                "{} object names but {} boxes",
                self.objects.names.len(),
                self.objects.boxes.len()
            )));
        }
        let rels = &self.relations;
        if rels.names.len() != rels.subj_ids.len() || rels.names.len() != rels.obj_ids.len() {
            return Err(malformed(format!(
                "relation sequences differ in length ({} names, {} subjects, {} objects)",
                rels.names.len(),
                rels.subj_ids.len(),
                rels.obj_ids.len()
            )));
        }
        let n = self.object_count();
        if let Some(&bad) = rels.subj_ids.iter().chain(&rels.obj_ids).find(|&&id| id >= n) {
            return Err(malformed(format!(
                "relation references object {bad} but the record has {n} objects"
            )));
        }
        Ok(())
    }
}

/// Task mode an annotation variant is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// Predicate detection: annotated relations only
    Detection,
    /// Predicate classification: unrelated pairs carry a background label
    Classification,
}

impl TaskMode {
    /// Whether probability estimation for this mode counts background pairs.
    pub fn with_background(self) -> bool {
        matches!(self, TaskMode::Classification)
    }
}

impl std::fmt::Display for TaskMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskMode::Detection => write!(f, "preddet"),
            TaskMode::Classification => write!(f, "predcls"),
        }
    }
}
