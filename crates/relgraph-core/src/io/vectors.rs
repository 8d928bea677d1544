//! Word-vector lookup for vocabulary labels.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::error::{PipelineError, PipelineResult};

/// Looks up embedding vectors for individual tokens.
pub trait Embedder {
    /// Vector dimension.
    fn dim(&self) -> usize;

    /// Vectors for the requested tokens that are known; unknown tokens are absent.
    fn embed(&self, tokens: &[String]) -> PipelineResult<HashMap<String, Vec<f32>>>;
}

/// word2vec / GloVe text format: `token v1 v2 ... vN` per line, with an
/// optional `count dim` header line.
///
/// The file is streamed once per `embed` call and only requested tokens are
/// kept, so multi-gigabyte vector files never sit in memory.
pub struct TextVectorFile {
    path: PathBuf,
    dim: usize,
}

impl TextVectorFile {
    pub fn new(path: PathBuf, dim: usize) -> Self {
        Self { path, dim }
    }

    fn read_error(&self, e: impl std::fmt::Display) -> PipelineError {
        PipelineError::Embedding {
            message: format!("cannot read {:?}: {}", self.path, e),
        }
    }
}

impl Embedder for TextVectorFile {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, tokens: &[String]) -> PipelineResult<HashMap<String, Vec<f32>>> {
        let mut wanted: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        let mut found = HashMap::with_capacity(wanted.len());
        let mut skipped = 0usize;

        let file = File::open(&self.path).map_err(|e| self.read_error(e))?;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            if wanted.is_empty() {
                break;
            }
            let line = line.map_err(|e| self.read_error(e))?;
            let mut parts = line.split_whitespace();
            let Some(token) = parts.next() else {
                continue;
            };
            let rest: Vec<&str> = parts.collect();

            if line_no == 0 && rest.len() == 1 && token.parse::<usize>().is_ok() {
                if let Ok(header_dim) = rest[0].parse::<usize>() {
                    if header_dim != self.dim {
                        return Err(PipelineError::Embedding {
                            message: format!(
                                "{:?} holds {}-d vectors, expected {}",
                                self.path, header_dim, self.dim
                            ),
                        });
                    }
                    continue;
                }
            }

            if !wanted.contains(token) {
                continue;
            }
            let values: Result<Vec<f32>, _> = rest.iter().map(|v| v.parse::<f32>()).collect();
            match values {
                Ok(values) if values.len() == self.dim => {
                    wanted.remove(token);
                    found.insert(token.to_string(), values);
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(
                "Skipped {} malformed vector rows in {:?}",
                skipped,
                self.path
            );
        }
        tracing::debug!(
            "Resolved {}/{} tokens from {:?}",
            found.len(),
            found.len() + wanted.len(),
            self.path
        );
        Ok(found)
    }
}
