//! SCDV embedding model and its storage.
//!
//! # Architecture
//! A model maps every vocabulary word to soft cluster weights and an
//! idf-weighted word vector. Paragraphs are embedded into unit vectors whose
//! inner product is the similarity score. Before a query fans out to workers
//! the model is specialized for that query and its matrix is moved into a
//! read-only shared region.

mod embedding;
mod shared;
mod storage;
mod types;

pub use embedding::ScdvModel;
pub use shared::{SharedModel, SharedRegion};
pub use storage::{MODEL_SPEC_SUFFIX, ModelSpec, find_model_spec, load_model, write_model};
pub use types::{DocVector, ModelShape, QueryVecError, VectorError, inner_product};

#[cfg(test)]
pub(crate) use embedding::tests::toy_model;
