//! Word-vector table for the predicate and object vocabularies.
//!
//! A label's vector is the L2-normalized mean of its token vectors. Labels
//! with no known token get a zero vector.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::io::Embedder;
use crate::math;

use super::vocabulary::Vocabulary;

/// Vectors keyed by label, in vocabulary order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordVectorTable {
    pub dim: usize,
    pub predicates: IndexMap<String, Vec<f32>>,
    pub objects: IndexMap<String, Vec<f32>>,
}

/// Composes label vectors from token vectors.
pub struct WordVectorBuilder;

impl WordVectorBuilder {
    /// Lower-cased tokens of a label, split on whitespace and underscores.
    pub fn tokenize(label: &str) -> Vec<String> {
        label
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    pub fn build(
        predicates: &Vocabulary,
        objects: &Vocabulary,
        embedder: &dyn Embedder,
    ) -> PipelineResult<WordVectorTable> {
        let dim = embedder.dim();
        let tokens: IndexSet<String> = predicates
            .labels()
            .iter()
            .chain(objects.labels())
            .flat_map(|label| Self::tokenize(label))
            .collect();
        let tokens: Vec<String> = tokens.into_iter().collect();

        let vectors = embedder.embed(&tokens)?;
        if let Some((token, v)) = vectors.iter().find(|(_, v)| v.len() != dim) {
            return Err(PipelineError::Embedding {
                message: format!("vector for '{}' has {} values, expected {}", token, v.len(), dim),
            });
        }

        let mut missing = 0usize;
        let mut compose = |vocab: &Vocabulary| -> IndexMap<String, Vec<f32>> {
            vocab
                .labels()
                .iter()
                .map(|label| {
                    let vector = Self::label_vector(label, &vectors, dim).unwrap_or_else(|| {
                        tracing::debug!("No word vector for '{}'", label);
                        missing += 1;
                        vec![0.0; dim]
                    });
                    (label.clone(), vector)
                })
                .collect()
        };
        let predicate_vectors = compose(predicates);
        let object_vectors = compose(objects);

        if missing > 0 {
            tracing::warn!(
                "{} of {} labels have no word vector",
                missing,
                predicates.len() + objects.len()
            );
        }
        tracing::info!(
            "Built word vectors: {} predicates, {} objects ({} dims)",
            predicate_vectors.len(),
            object_vectors.len(),
            dim
        );

        Ok(WordVectorTable {
            dim,
            predicates: predicate_vectors,
            objects: object_vectors,
        })
    }

    fn label_vector(
        label: &str,
        vectors: &HashMap<String, Vec<f32>>,
        dim: usize,
    ) -> Option<Vec<f32>> {
        let tokens = Self::tokenize(label);
        let mut v = math::mean(
            tokens
                .iter()
                .filter_map(|t| vectors.get(t))
                .map(Vec::as_slice),
            dim,
        )?;
        math::l2_normalize_in_place(&mut v);
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Fixed(HashMap<String, Vec<f32>>, usize);

    impl Embedder for Fixed {
        fn dim(&self) -> usize {
            self.1
        }

        fn embed(&self, tokens: &[String]) -> PipelineResult<HashMap<String, Vec<f32>>> {
            Ok(tokens
                .iter()
                .filter_map(|t| self.0.get(t).map(|v| (t.clone(), v.clone())))
                .collect())
        }
    }

    fn embedder() -> Fixed {
        let mut vectors = HashMap::new();
        vectors.insert("on".to_string(), vec![2.0, 0.0]);
        vectors.insert("top".to_string(), vec![0.0, 1.0]);
        vectors.insert("of".to_string(), vec![0.0, 1.0]);
        vectors.insert("dog".to_string(), vec![3.0, 4.0]);
        Fixed(vectors, 2)
    }

    fn vocab(labels: &[&str]) -> Vocabulary {
        Vocabulary::try_from(labels.iter().map(|l| l.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(WordVectorBuilder::tokenize("on top of"), vec!["on", "top", "of"]);
        assert_eq!(WordVectorBuilder::tokenize("Traffic_Light"), vec!["traffic", "light"]);
        assert!(WordVectorBuilder::tokenize("  ").is_empty());
    }

    #[test]
    fn test_build_composes_and_normalizes() {
        let table =
            WordVectorBuilder::build(&vocab(&["on top of"]), &vocab(&["dog", "unicorn"]), &embedder())
                .unwrap();

        assert_eq!(table.dim, 2);
        // mean([2,0],[0,1],[0,1]) = [2/3, 2/3] -> unit length
        let v = &table.predicates["on top of"];
        assert_relative_eq!(v[0], std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(v[1], std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);

        assert_relative_eq!(table.objects["dog"][0], 0.6, epsilon = 1e-6);
        assert_eq!(table.objects["unicorn"], vec![0.0, 0.0]);
    }

    #[test]
    fn test_build_keeps_vocabulary_order() {
        let table =
            WordVectorBuilder::build(&vocab(&["on"]), &vocab(&["zebra", "dog", "ant"]), &embedder())
                .unwrap();
        let keys: Vec<&str> = table.objects.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zebra", "dog", "ant"]);
    }

    #[test]
    fn test_build_rejects_wrong_dimension() {
        let mut bad = embedder();
        bad.0.insert("dog".to_string(), vec![1.0, 2.0, 3.0]);
        let err = WordVectorBuilder::build(&vocab(&[]), &vocab(&["dog"]), &bad).unwrap_err();
        assert!(matches!(err, PipelineError::Embedding { .. }));
    }
}
