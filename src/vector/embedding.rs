//! SCDV embedding model.
//!
//! Every vocabulary word owns one row: its soft cluster-membership weights
//! followed by its idf-weighted word vector. A bag of words is embedded as the
//! frequency-weighted sum of `outer(cluster_weights, idf_vector)` over the
//! words, flattened row-major and scaled to unit length.
//!
//! # Query specialization
//! [`ScdvModel::specialize_for_query`] consumes the model and returns a smaller
//! one that only keeps words and cluster columns relevant to one query. The
//! coordinate system changes with it, so the query vector has to be embedded
//! again with the returned model and the original must not be reused.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rayon::prelude::*;

use crate::vector::shared::SharedRegion;
use crate::vector::types::{DocVector, ModelShape, QueryVecError, VectorError, l2_norm};

/// Words whose single-word similarity to the query is below this are dropped.
const WORD_SIMILARITY_CUTOFF: f32 = 0.001;

/// Cluster columns whose query block norm is below this are dropped.
const CLUSTER_NORM_CUTOFF: f32 = 0.001;

/// Backing storage of the row matrix.
#[derive(Debug)]
pub(crate) enum RowStore {
    Owned(Vec<f32>),
    Shared(SharedRegion),
}

impl RowStore {
    fn as_slice(&self) -> &[f32] {
        match self {
            RowStore::Owned(values) => values,
            RowStore::Shared(region) => region.as_slice(),
        }
    }
}

/// Word-embedding model: vocabulary plus concatenated (cluster ‖ idf) rows.
#[derive(Debug)]
pub struct ScdvModel {
    word_to_row: HashMap<String, usize>,
    rows: RowStore,
    shape: ModelShape,
}

impl ScdvModel {
    /// Builds a model from a vocabulary and two row-major matrices.
    ///
    /// `cluster_weights` holds one `shape.clusters()`-wide row per word and
    /// `idf_vectors` one `shape.features()`-wide row per word.
    pub fn from_flat(
        words: Vec<String>,
        shape: ModelShape,
        cluster_weights: &[f32],
        idf_vectors: &[f32],
    ) -> Result<Self, crate::DvgError> {
        let cluster_rows = row_count(cluster_weights.len(), shape.clusters())?;
        let idf_rows = row_count(idf_vectors.len(), shape.features())?;
        if cluster_rows != idf_rows {
            return Err(crate::DvgError::ModelShapeMismatch {
                cluster_rows,
                idf_rows,
            });
        }
        if words.len() != cluster_rows {
            return Err(VectorError::VocabularyMismatch {
                words: words.len(),
                rows: cluster_rows,
            }
            .into());
        }

        let mut word_to_row = HashMap::with_capacity(words.len());
        for (row, word) in words.into_iter().enumerate() {
            match word_to_row.entry(word) {
                Entry::Occupied(e) => {
                    return Err(VectorError::DuplicateWord(e.key().clone()).into());
                }
                Entry::Vacant(e) => {
                    e.insert(row);
                }
            }
        }

        let mut rows = Vec::with_capacity(cluster_rows * shape.row_len());
        for (cw, iv) in cluster_weights
            .chunks_exact(shape.clusters())
            .zip(idf_vectors.chunks_exact(shape.features()))
        {
            rows.extend_from_slice(cw);
            rows.extend_from_slice(iv);
        }

        Ok(Self {
            word_to_row,
            rows: RowStore::Owned(rows),
            shape,
        })
    }

    /// Convenience constructor taking one `Vec` per row.
    pub fn from_rows(
        words: &[&str],
        cluster_weights: &[Vec<f32>],
        idf_vectors: &[Vec<f32>],
    ) -> Result<Self, crate::DvgError> {
        let clusters = cluster_weights.first().map_or(0, Vec::len);
        let features = idf_vectors.first().map_or(0, Vec::len);
        let shape = ModelShape::new(clusters, features)?;
        let cw: Vec<f32> = cluster_weights.iter().flatten().copied().collect();
        let iv: Vec<f32> = idf_vectors.iter().flatten().copied().collect();
        Self::from_flat(
            words.iter().map(|w| (*w).to_string()).collect(),
            shape,
            &cw,
            &iv,
        )
    }

    #[must_use]
    pub fn shape(&self) -> ModelShape {
        self.shape
    }

    /// Number of words in the vocabulary.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.word_to_row.len()
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.word_to_row.contains_key(word)
    }

    /// Row index of a word, if it is in the vocabulary.
    #[must_use]
    pub fn row_index(&self, word: &str) -> Option<usize> {
        self.word_to_row.get(word).copied()
    }

    /// The concatenated (cluster ‖ idf) row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f32] {
        let len = self.shape.row_len();
        &self.rows.as_slice()[index * len..(index + 1) * len]
    }

    /// Tokens that the vocabulary does not know.
    pub fn find_oov_tokens<'a, S: AsRef<str>>(&self, tokens: &'a [S]) -> Vec<&'a str> {
        tokens
            .iter()
            .map(AsRef::as_ref)
            .filter(|t| !self.contains(t))
            .collect()
    }

    /// Embeds a bag of tokens into a unit vector (all-zero when no token is known).
    pub fn embed<S: AsRef<str>>(&self, tokens: &[S]) -> DocVector {
        DocVector::normalized(self.accumulate(tokens))
    }

    /// Per-cluster weight profile: block norms of the sparsified embedding,
    /// scaled to sum to one. All-zero when the tokens carry no cluster mass.
    pub fn cluster_weights<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<f32> {
        let mut norms = self.embed(tokens).sparsify().cluster_norms(self.shape);
        let sum: f32 = norms.iter().sum();
        if sum == 0.0 {
            return norms;
        }
        norms.iter_mut().for_each(|n| *n /= sum);
        norms
    }

    /// Shrinks the model to the words and cluster columns relevant to `query`.
    ///
    /// Fails with [`QueryVecError`] when the sparsified query is all-zero.
    /// The returned model uses a different coordinate system; embed the query
    /// again with it.
    pub fn specialize_for_query(self, query: &DocVector) -> Result<Self, QueryVecError> {
        if query.len() != self.shape.vector_len() {
            return Err(QueryVecError::DimensionMismatch {
                expected: self.shape.vector_len(),
                actual: query.len(),
            });
        }
        let query = query.sparsify();
        if query.is_zero() {
            return Err(QueryVecError::NoTopics);
        }
        Ok(self.retain_for(&query))
    }

    /// The pruning half of specialization. Never removes every word nor every
    /// cluster column, even for an all-zero query.
    pub(crate) fn retain_for(self, query: &DocVector) -> Self {
        let clusters = self.shape.clusters();
        let features = self.shape.features();

        let mut by_row: Vec<(usize, &str)> = self
            .word_to_row
            .iter()
            .map(|(w, &i)| (i, w.as_str()))
            .collect();
        by_row.sort_unstable();

        let keep: Vec<bool> = by_row
            .par_iter()
            .map(|&(row, _)| {
                let sim = self.embed_row(row).inner(query);
                sim.abs() >= WORD_SIMILARITY_CUTOFF
            })
            .collect();

        let mut kept_rows: Vec<(usize, String)> = by_row
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(&(row, w), _)| (row, w.to_string()))
            .collect();
        if kept_rows.is_empty() {
            if let Some(&(row, w)) = by_row.iter().min_by(|a, b| a.1.cmp(b.1)) {
                kept_rows.push((row, w.to_string()));
            }
        }

        let mut kept_clusters: Vec<usize> = query
            .as_slice()
            .chunks(features)
            .enumerate()
            .filter(|(_, block)| l2_norm(block) >= CLUSTER_NORM_CUTOFF)
            .map(|(ci, _)| ci)
            .collect();
        if kept_clusters.is_empty() {
            kept_clusters.push(clusters - 1);
        }

        let shape = self.shape.with_clusters(kept_clusters.len());
        let mut rows = Vec::with_capacity(kept_rows.len() * shape.row_len());
        let mut word_to_row = HashMap::with_capacity(kept_rows.len());
        for (new_index, (row, word)) in kept_rows.into_iter().enumerate() {
            let old = self.row(row);
            rows.extend(kept_clusters.iter().map(|&ci| old[ci]));
            rows.extend_from_slice(&old[clusters..]);
            word_to_row.insert(word, new_index);
        }

        tracing::debug!(
            words = word_to_row.len(),
            clusters = shape.clusters(),
            "specialized model for query"
        );

        Self {
            word_to_row,
            rows: RowStore::Owned(rows),
            shape,
        }
    }

    /// Moves the row matrix into a read-only shared region.
    pub fn into_shared(self) -> std::io::Result<crate::vector::SharedModel> {
        let region = SharedRegion::publish(self.rows.as_slice())?;
        Ok(crate::vector::SharedModel::new(Self {
            word_to_row: self.word_to_row,
            rows: RowStore::Shared(region),
            shape: self.shape,
        }))
    }

    /// True when the row matrix lives in a shared region.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self.rows, RowStore::Shared(_))
    }

    /// Unit embedding of a single vocabulary row.
    fn embed_row(&self, row: usize) -> DocVector {
        let mut acc = vec![0.0f32; self.shape.vector_len()];
        self.add_outer(&mut acc, row, 1.0);
        DocVector::normalized(acc)
    }

    fn accumulate<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<f32> {
        // Frequencies in first-appearance order keep the summation order stable.
        let mut order: Vec<(usize, f32)> = Vec::new();
        let mut seen: HashMap<usize, usize> = HashMap::new();
        for token in tokens {
            if let Some(&row) = self.word_to_row.get(token.as_ref()) {
                match seen.entry(row) {
                    Entry::Occupied(e) => order[*e.get()].1 += 1.0,
                    Entry::Vacant(e) => {
                        e.insert(order.len());
                        order.push((row, 1.0));
                    }
                }
            }
        }

        let mut acc = vec![0.0f32; self.shape.vector_len()];
        for (row, freq) in order {
            self.add_outer(&mut acc, row, freq);
        }
        acc
    }

    fn add_outer(&self, acc: &mut [f32], row: usize, freq: f32) {
        let features = self.shape.features();
        let (cluster_weights, idf) = self.row(row).split_at(self.shape.clusters());
        for (block, &w) in acc.chunks_mut(features).zip(cluster_weights) {
            let w = w * freq;
            if w == 0.0 {
                continue;
            }
            for (a, &v) in block.iter_mut().zip(idf) {
                *a += w * v;
            }
        }
    }
}

fn row_count(values: usize, row_len: usize) -> Result<usize, VectorError> {
    if values % row_len != 0 {
        return Err(VectorError::RaggedMatrix { values, row_len });
    }
    Ok(values / row_len)
}
