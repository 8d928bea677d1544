//! Raw scene graphs to unified annotation records.
//!
//! Object keys are enumerated in document order and that order is the object
//! index. Relation targets are resolved through a key-to-index map built once
//! per scene, so a dangling target is caught instead of producing a bad index.

use std::collections::HashMap;

use crate::config::{Config, SelfRelationPolicy};
use crate::error::{PipelineError, PipelineResult};
use crate::io::{ImageScale, SceneGraphLoader};
use crate::types::{
    AnnotationRecord, BoundingBox, ObjectAnnotations, RawScene, RawSceneGraph,
    RelationAnnotations, Split,
};

/// Converts raw scene graphs into annotation records.
pub struct AnnotationBuilder<'a> {
    scale: &'a dyn ImageScale,
    self_relations: SelfRelationPolicy,
    image_extension: String,
}

impl<'a> AnnotationBuilder<'a> {
    /// Builder that rejects self-relations and names images `<scene>.jpg`.
    pub fn new(scale: &'a dyn ImageScale) -> Self {
        Self {
            scale,
            self_relations: SelfRelationPolicy::default(),
            image_extension: "jpg".to_string(),
        }
    }

    /// Builder using the configured self-relation policy and image extension.
    pub fn from_config(scale: &'a dyn ImageScale, config: &Config) -> Self {
        Self::new(scale)
            .with_self_relations(config.annotations.self_relations)
            .with_image_extension(config.dataset.image_extension.clone())
    }

    pub fn with_self_relations(mut self, policy: SelfRelationPolicy) -> Self {
        self.self_relations = policy;
        self
    }

    pub fn with_image_extension(mut self, extension: impl Into<String>) -> Self {
        self.image_extension = extension.into();
        self
    }

    /// Build records for every scene of one split, in scene order.
    pub fn build(
        &self,
        graphs: &RawSceneGraph,
        split: Split,
    ) -> PipelineResult<Vec<AnnotationRecord>> {
        let start = std::time::Instant::now();
        let mut dropped = 0usize;
        let records = graphs
            .iter()
            .map(|(scene_id, scene)| self.build_scene(scene_id, scene, split, &mut dropped))
            .collect::<PipelineResult<Vec<_>>>()?;

        if dropped > 0 {
            tracing::warn!("Dropped {} self-relations from the {} split", dropped, split);
        }
        tracing::info!(
            "Built {} {} annotation records ({} relations) in {:?}",
            records.len(),
            split,
            records.iter().map(AnnotationRecord::relation_count).sum::<usize>(),
            start.elapsed()
        );
        Ok(records)
    }

    /// Build the unified corpus: train records followed by val records.
    pub fn build_corpus(
        &self,
        loader: &dyn SceneGraphLoader,
    ) -> PipelineResult<Vec<AnnotationRecord>> {
        let mut records = self.build(&loader.load(Split::Train)?, Split::Train)?;
        records.extend(self.build(&loader.load(Split::Val)?, Split::Val)?);
        Ok(records)
    }

    fn build_scene(
        &self,
        scene_id: &str,
        scene: &RawScene,
        split: Split,
        dropped: &mut usize,
    ) -> PipelineResult<AnnotationRecord> {
        let key_index: HashMap<&str, usize> = scene
            .objects
            .keys()
            .enumerate()
            .map(|(i, key)| (key.as_str(), i))
            .collect();

        let n = scene.objects.len();
        let mut objects = ObjectAnnotations {
            names: Vec::with_capacity(n),
            boxes: Vec::with_capacity(n),
        };
        let mut relations = RelationAnnotations {
            names: Vec::new(),
            subj_ids: Vec::new(),
            obj_ids: Vec::new(),
        };

        for (subject, (key, obj)) in scene.objects.iter().enumerate() {
            if obj.w < 0 || obj.h < 0 {
                return Err(PipelineError::MalformedAnnotation {
                    scene: scene_id.to_string(),
                    message: format!(
                        "object '{}' has negative size {}x{}",
                        key, obj.w, obj.h
                    ),
                });
            }
            objects.names.push(obj.name.clone());
            objects
                .boxes
                .push(BoundingBox::from_xywh(obj.x, obj.y, obj.w, obj.h));

            for relation in &obj.relations {
                let target = *key_index.get(relation.object.as_str()).ok_or_else(|| {
                    PipelineError::MalformedAnnotation {
                        scene: scene_id.to_string(),
                        message: format!(
                            "relation '{}' on object '{}' targets missing object '{}'",
                            relation.name, key, relation.object
                        ),
                    }
                })?;

                if target == subject {
                    match self.self_relations {
                        SelfRelationPolicy::Reject => {
                            return Err(PipelineError::SelfRelation {
                                scene: scene_id.to_string(),
                                object: key.clone(),
                            })
                        }
                        SelfRelationPolicy::Drop => {
                            tracing::debug!(
                                "Dropping self-relation '{}' on {}/{}",
                                relation.name,
                                scene_id,
                                key
                            );
                            *dropped += 1;
                            continue;
                        }
                        SelfRelationPolicy::Keep => {}
                    }
                }

                relations.names.push(relation.name.clone());
                relations.subj_ids.push(subject);
                relations.obj_ids.push(target);
            }
        }

        let filename = format!("{}.{}", scene_id, self.image_extension);
        let im_scale = self.scale.image_scale(&filename)?;

        Ok(AnnotationRecord {
            filename,
            split_id: split,
            height: scene.height,
            width: scene.width,
            im_scale,
            objects,
            relations,
        })
    }
}
