//! Predicate and object vocabularies.
//!
//! A vocabulary is an ordered list of distinct labels whose positions are the
//! integer ids used by every remapped artifact. Labels are collected in
//! first-seen order so the same annotation sequence always yields the same ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::AnnotationRecord;

/// A frozen, index-ordered set of labels.
///
/// Serialized as a plain JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct Vocabulary {
    labels: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl Vocabulary {
    /// Append `label` unless already present; returns its index.
    fn insert(&mut self, label: &str) -> usize {
        if let Some(&i) = self.by_name.get(label) {
            return i;
        }
        let i = self.labels.len();
        self.labels.push(label.to_string());
        self.by_name.insert(label.to_string(), i);
        i
    }

    /// All labels, in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of a label.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.by_name.get(label).copied()
    }

    /// Label at an index.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// BLAKE3 hash of all labels in order.
    ///
    /// Remapped artifacts record this so a later stage can tell whether they
    /// were built against the vocabulary it is holding.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for label in &self.labels {
            hasher.update(label.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = String;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        let mut vocab = Vocabulary::default();
        for label in &labels {
            let before = vocab.len();
            if vocab.insert(label) < before {
                return Err(format!("duplicate vocabulary label '{label}'"));
            }
        }
        Ok(vocab)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.labels
    }
}

/// Scans unified annotations for their predicate and object labels.
pub struct VocabularyExtractor;

impl VocabularyExtractor {
    /// Build `(predicates, objects)` in first-seen order.
    pub fn extract(annotations: &[AnnotationRecord]) -> (Vocabulary, Vocabulary) {
        let mut predicates = Vocabulary::default();
        let mut objects = Vocabulary::default();

        for record in annotations {
            for name in &record.objects.names {
                objects.insert(name);
            }
            for name in &record.relations.names {
                predicates.insert(name);
            }
        }

        tracing::info!(
            "Extracted vocabularies: {} predicates, {} objects",
            predicates.len(),
            objects.len()
        );
        (predicates, objects)
    }
}
