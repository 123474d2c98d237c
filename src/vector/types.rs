//! Core vector types for the SCDV embedding.
//!
//! A document vector is the row-major flattening of a
//! (cluster count × feature count) matrix. It is either unit-norm or all-zero.

use thiserror::Error;

/// Entries below this share of `|max| + |min|` are zeroed by [`DocVector::sparsify`].
const SPARSE_THRESHOLD_RATIO: f32 = 0.5 * 0.02;

/// Shape of the embedding: number of clusters and number of features per cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    clusters: usize,
    features: usize,
}

impl ModelShape {
    /// Creates a new shape, rejecting empty dimensions.
    pub fn new(clusters: usize, features: usize) -> Result<Self, VectorError> {
        if clusters == 0 || features == 0 {
            return Err(VectorError::InvalidShape { clusters, features });
        }
        Ok(Self { clusters, features })
    }

    /// Same feature count with a reduced, non-zero number of clusters.
    pub(crate) const fn with_clusters(self, clusters: usize) -> Self {
        Self { clusters, ..self }
    }

    /// Number of soft clusters (the cluster-weight row length).
    #[must_use]
    pub const fn clusters(&self) -> usize {
        self.clusters
    }

    /// Number of features (the idf-vector row length).
    #[must_use]
    pub const fn features(&self) -> usize {
        self.features
    }

    /// Length of one concatenated model row.
    #[must_use]
    pub const fn row_len(&self) -> usize {
        self.clusters + self.features
    }

    /// Length of a flattened document vector.
    #[must_use]
    pub const fn vector_len(&self) -> usize {
        self.clusters * self.features
    }
}

/// Dense document vector, unit-norm or all-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DocVector(Vec<f32>);

impl DocVector {
    /// All-zero vector of the given length.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    /// Wraps raw values without normalizing them.
    #[must_use]
    pub fn from_raw(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Scales `values` to unit length; an all-zero input stays all-zero.
    #[must_use]
    pub fn normalized(mut values: Vec<f32>) -> Self {
        let norm = l2_norm(&values);
        if norm != 0.0 {
            let scale = 1.0 / norm;
            values.iter_mut().for_each(|v| *v *= scale);
        }
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when no entry is non-zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    /// Inner product; equals cosine similarity for unit vectors.
    #[must_use]
    pub fn inner(&self, other: &DocVector) -> f32 {
        inner_product(&self.0, &other.0)
    }

    /// Zeroes entries whose magnitude is below `0.5 * 0.02 * (|max| + |min|)`.
    #[must_use]
    pub fn sparsify(&self) -> DocVector {
        let (min, max) = self
            .0
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if self.0.is_empty() {
            return self.clone();
        }
        let threshold = (max.abs() + min.abs()) * SPARSE_THRESHOLD_RATIO;
        DocVector(
            self.0
                .iter()
                .map(|&v| if v.abs() < threshold { 0.0 } else { v })
                .collect(),
        )
    }

    /// L2 norm of each cluster block (`features` consecutive entries).
    #[must_use]
    pub fn cluster_norms(&self, shape: ModelShape) -> Vec<f32> {
        debug_assert_eq!(self.0.len(), shape.vector_len());
        self.0.chunks(shape.features()).map(l2_norm).collect()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// Plain inner product of two equally long slices.
#[must_use]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// The query shares no cluster mass with the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryVecError {
    #[error("query vector does not contain any topics in the model")]
    NoTopics,

    #[error("query vector has length {actual}, the model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised while assembling a model from raw matrices.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Invalid model shape: {clusters} clusters x {features} features")]
    InvalidShape { clusters: usize, features: usize },

    #[error("Matrix of {values} values is not a whole number of {row_len}-wide rows")]
    RaggedMatrix { values: usize, row_len: usize },

    #[error("Vocabulary has {words} words but the matrices have {rows} rows")]
    VocabularyMismatch { words: usize, rows: usize },

    #[error("Duplicated word in vocabulary: {0:?}")]
    DuplicateWord(String),
}
