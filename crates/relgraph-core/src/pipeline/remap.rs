//! Name-to-index remapping against frozen vocabularies.

use serde::{Deserialize, Serialize};

use crate::error::{LabelKind, PipelineError, PipelineResult};
use crate::types::{
    AnnotationRecord, ObjectAnnotations, RelationAnnotations, RemappedAnnotationRecord, TaskMode,
};

use super::vocabulary::Vocabulary;

/// A persisted task-specific annotation variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemappedAnnotationSet {
    pub mode: TaskMode,
    pub num_predicates: usize,
    /// Index of the background label; only set in classification mode.
    pub background_label: Option<usize>,
    pub predicate_vocab_hash: String,
    pub object_vocab_hash: String,
    pub records: Vec<RemappedAnnotationRecord>,
}

impl RemappedAnnotationSet {
    /// Fail if this set was remapped against different vocabularies.
    pub fn check_vocabularies(
        &self,
        predicates: &Vocabulary,
        objects: &Vocabulary,
    ) -> PipelineResult<()> {
        if self.predicate_vocab_hash != predicates.content_hash()
            || self.object_vocab_hash != objects.content_hash()
        {
            return Err(PipelineError::StaleArtifact {
                name: format!("{} annotations", self.mode),
                message: "remapped against a different vocabulary; delete it to rebuild"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Rewrites label names as vocabulary indices.
pub struct LabelRemapper;

impl LabelRemapper {
    /// Remap every record. Record shape is the same in both modes.
    pub fn remap(
        annotations: &[AnnotationRecord],
        predicates: &Vocabulary,
        objects: &Vocabulary,
        mode: TaskMode,
    ) -> PipelineResult<Vec<RemappedAnnotationRecord>> {
        let records = annotations
            .iter()
            .map(|record| Self::remap_record(record, predicates, objects))
            .collect::<PipelineResult<Vec<_>>>()?;
        tracing::info!("Remapped {} records for {}", records.len(), mode);
        Ok(records)
    }

    /// Remap and wrap the records with their mode and vocabulary fingerprints.
    pub fn remap_set(
        annotations: &[AnnotationRecord],
        predicates: &Vocabulary,
        objects: &Vocabulary,
        mode: TaskMode,
    ) -> PipelineResult<RemappedAnnotationSet> {
        let records = Self::remap(annotations, predicates, objects, mode)?;
        Ok(RemappedAnnotationSet {
            mode,
            num_predicates: predicates.len(),
            background_label: mode.with_background().then_some(predicates.len()),
            predicate_vocab_hash: predicates.content_hash(),
            object_vocab_hash: objects.content_hash(),
            records,
        })
    }

    fn remap_record(
        record: &AnnotationRecord,
        predicates: &Vocabulary,
        objects: &Vocabulary,
    ) -> PipelineResult<RemappedAnnotationRecord> {
        Ok(AnnotationRecord {
            filename: record.filename.clone(),
            split_id: record.split_id,
            height: record.height,
            width: record.width,
            im_scale: record.im_scale,
            objects: ObjectAnnotations {
                names: Self::lookup_all(&record.objects.names, objects, LabelKind::Object)?,
                boxes: record.objects.boxes.clone(),
            },
            relations: RelationAnnotations {
                names: Self::lookup_all(&record.relations.names, predicates, LabelKind::Predicate)?,
                subj_ids: record.relations.subj_ids.clone(),
                obj_ids: record.relations.obj_ids.clone(),
            },
        })
    }

    fn lookup_all(
        names: &[String],
        vocab: &Vocabulary,
        kind: LabelKind,
    ) -> PipelineResult<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                vocab
                    .index_of(name)
                    .ok_or_else(|| PipelineError::UnknownLabel {
                        kind,
                        label: name.clone(),
                    })
            })
            .collect()
    }

    /// Map a remapped record back to label names.
    pub fn decode(
        record: &RemappedAnnotationRecord,
        predicates: &Vocabulary,
        objects: &Vocabulary,
    ) -> PipelineResult<AnnotationRecord> {
        let names = |ids: &[usize], vocab: &Vocabulary, kind: LabelKind| {
            ids.iter()
                .map(|&i| {
                    vocab
                        .label(i)
                        .map(str::to_string)
                        .ok_or_else(|| PipelineError::UnknownLabel {
                            kind,
                            label: format!("#{i}"),
                        })
                })
                .collect::<PipelineResult<Vec<_>>>()
        };

        Ok(AnnotationRecord {
            filename: record.filename.clone(),
            split_id: record.split_id,
            height: record.height,
            width: record.width,
            im_scale: record.im_scale,
            objects: ObjectAnnotations {
                names: names(&record.objects.names, objects, LabelKind::Object)?,
                boxes: record.objects.boxes.clone(),
            },
            relations: RelationAnnotations {
                names: names(&record.relations.names, predicates, LabelKind::Predicate)?,
                subj_ids: record.relations.subj_ids.clone(),
                obj_ids: record.relations.obj_ids.clone(),
            },
        })
    }
}
