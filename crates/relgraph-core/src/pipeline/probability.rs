//! Conditional predicate probabilities per ordered category pair.
//!
//! Counts are accumulated in a `[subject][object][label]` array and every
//! `[subject][object]` row is normalized by its own total. In background mode
//! the last label slot, at `len(predicates)`, counts ordered pairs of distinct
//! objects that carry no annotated relation in that direction.

use std::collections::HashSet;

use ndarray::{Array3, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{LabelKind, PipelineError, PipelineResult};
use crate::types::RemappedAnnotationRecord;

use super::vocabulary::Vocabulary;

/// Empirical `P(label | subject category, object category)`.
///
/// A row whose pair was never observed is all zeros; callers must treat that
/// as "no evidence", not as a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTable {
    pub with_background: bool,
    pub num_predicates: usize,
    probabilities: Array3<f64>,
}

impl ProbabilityTable {
    /// `(objects, objects, predicates [+ 1 for background])`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.probabilities.dim()
    }

    /// Probability of `label` for the ordered pair, `None` if out of range.
    pub fn get(&self, subject: usize, object: usize, label: usize) -> Option<f64> {
        self.probabilities.get([subject, object, label]).copied()
    }

    /// Label distribution for an ordered category pair.
    pub fn row(&self, subject: usize, object: usize) -> ArrayView1<'_, f64> {
        self.probabilities.slice(ndarray::s![subject, object, ..])
    }

    /// Slot of the background label, when present.
    pub fn background_index(&self) -> Option<usize> {
        self.with_background.then_some(self.num_predicates)
    }

    /// Probability that the ordered pair is unrelated.
    pub fn background(&self, subject: usize, object: usize) -> Option<f64> {
        self.background_index()
            .and_then(|bg| self.get(subject, object, bg))
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.probabilities
    }
}

/// Estimates probability tables from remapped annotations.
pub struct ProbabilityEstimator;

impl ProbabilityEstimator {
    /// Count and normalize.
    pub fn estimate(
        records: &[RemappedAnnotationRecord],
        predicates: &Vocabulary,
        objects: &Vocabulary,
        with_background: bool,
    ) -> PipelineResult<ProbabilityTable> {
        let start = std::time::Instant::now();
        let mut probabilities = Self::count(records, predicates, objects, with_background)?;

        let mut observed = 0usize;
        for mut row in probabilities.lanes_mut(Axis(2)) {
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|c| c / total);
                observed += 1;
            }
        }

        tracing::info!(
            "Estimated {} probabilities: {} of {} category pairs observed",
            if with_background { "background-inclusive" } else { "foreground" },
            observed,
            objects.len() * objects.len()
        );
        tracing::trace!("  Estimate: {:?}", start.elapsed());

        Ok(ProbabilityTable {
            with_background,
            num_predicates: predicates.len(),
            probabilities,
        })
    }

    /// Raw label counts, before normalization.
    pub fn count(
        records: &[RemappedAnnotationRecord],
        predicates: &Vocabulary,
        objects: &Vocabulary,
        with_background: bool,
    ) -> PipelineResult<Array3<f64>> {
        let n_obj = objects.len();
        let n_pred = predicates.len();
        let labels = if with_background { n_pred + 1 } else { n_pred };
        let mut counts = Array3::<f64>::zeros((n_obj, n_obj, labels));

        for record in records {
            record.validate()?;
            let categories = &record.objects.names;
            if let Some(&bad) = categories.iter().find(|&&c| c >= n_obj) {
                return Err(out_of_range(LabelKind::Object, bad));
            }

            let mut related = HashSet::with_capacity(record.relation_count());
            for (subj, obj, &predicate) in record.relation_triples() {
                if predicate >= n_pred {
                    return Err(out_of_range(LabelKind::Predicate, predicate));
                }
                counts[[categories[subj], categories[obj], predicate]] += 1.0;
                related.insert((subj, obj));
            }

            if with_background {
                let n = categories.len();
                for i in 0..n {
                    for j in 0..n {
                        if i != j && !related.contains(&(i, j)) {
                            counts[[categories[i], categories[j], n_pred]] += 1.0;
                        }
                    }
                }
            }
        }
        Ok(counts)
    }
}

fn out_of_range(kind: LabelKind, index: usize) -> PipelineError {
    PipelineError::UnknownLabel {
        kind,
        label: format!("#{index}"),
    }
}
