//! Document-vector grep: ranks paragraphs of local text documents by their
//! semantic similarity to a query, using a sparse composite document vector
//! (SCDV) model.
//!
//! Two drivers share one scoring pipeline: [`search::direct`] scans every
//! document given, [`index::query`] first streams an approximate cluster
//! index to skip paragraphs that cannot match.

pub mod config;
pub mod display;
pub mod document;
pub mod error;
pub mod index;
pub mod io;
pub mod paths;
pub mod pool;
pub mod search;
pub mod tokenize;
pub mod vector;

// Explicit exports for better API clarity
pub use config::{SearchConfig, SearchOverrides, Settings};
pub use document::{DocumentSource, TextScanner};
pub use error::{DvgError, DvgResult, ScanError};
pub use pool::WorkerPool;
pub use search::{ScoredParagraph, SearchOutcome, SearchSession};
pub use tokenize::{Tokenizer, tokenizer_for};
pub use vector::{ModelSpec, ScdvModel, find_model_spec, load_model};
