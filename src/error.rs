//! Error types for the document search engine
//!
//! Fatal errors abort the whole run and map to a non-zero exit code.
//! Per-document scan errors live in [`ScanError`] and never abort a batch.

use crate::vector::{QueryVecError, VectorError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for model loading, searching and indexing.
#[derive(Error, Debug)]
pub enum DvgError {
    /// Model lookup errors
    #[error("Model not found: {name}")]
    ModelNotFound { name: String },

    #[error("Invalid model spec '{path}': {reason}")]
    ModelSpec { path: PathBuf, reason: String },

    #[error("Invalid model file '{path}': {reason}")]
    ModelFormat { path: PathBuf, reason: String },

    #[error(
        "Model matrices disagree: {cluster_rows} cluster-weight rows vs {idf_rows} idf-vector rows"
    )]
    ModelShapeMismatch { cluster_rows: usize, idf_rows: usize },

    #[error("Invalid model data: {0}")]
    Vector(#[from] VectorError),

    /// Degenerate query vector
    #[error(transparent)]
    QueryVec(#[from] QueryVecError),

    /// Index errors
    #[error("Index db file not found: {path}")]
    IndexMissing { path: PathBuf },

    #[error("Index appears to be corrupted at line {line}: {reason}")]
    IndexCorrupted { line: usize, reason: String },

    /// Input errors
    #[error("File must be specified by a normalized relative path: {path}")]
    InvalidPath { path: String },

    #[error("File removed while running: {path}")]
    FileVanished { path: PathBuf },

    #[error("Unknown tokenizer '{name}'. Supported: en, ws")]
    UnknownTokenizer { name: String },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// File system errors
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

impl DvgError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::ModelSpec { .. } => "MODEL_SPEC_ERROR",
            Self::ModelFormat { .. } => "MODEL_FORMAT_ERROR",
            Self::ModelShapeMismatch { .. } => "MODEL_SHAPE_MISMATCH",
            Self::Vector(_) => "MODEL_DATA_ERROR",
            Self::QueryVec(_) => "QUERY_VEC_ERROR",
            Self::IndexMissing { .. } => "INDEX_MISSING",
            Self::IndexCorrupted { .. } => "INDEX_CORRUPTED",
            Self::InvalidPath { .. } => "INVALID_PATH",
            Self::FileVanished { .. } => "FILE_VANISHED",
            Self::UnknownTokenizer { .. } => "UNKNOWN_TOKENIZER",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::FileWrite { .. } => "FILE_WRITE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::General(_) => "GENERAL_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::ModelNotFound { .. } => vec![
                "Check the model name and the [model] dir setting",
                "A model is described by a <name>.model.toml file next to its packed model file",
            ],
            Self::ModelShapeMismatch { .. } | Self::ModelFormat { .. } => {
                vec!["Re-create the packed model file, it is truncated or inconsistent"]
            }
            Self::QueryVec(_) => vec![
                "The query shares no words with the model vocabulary",
                "Rephrase the query with more common words",
            ],
            Self::IndexMissing { .. } => vec!["Run 'dvg index build' with the same model and window"],
            Self::IndexCorrupted { .. } => vec!["Run 'dvg index build' to rebuild the index from scratch"],
            Self::InvalidPath { .. } => {
                vec!["Run from the directory the index was built in and pass relative paths"]
            }
            Self::FileVanished { .. } => {
                vec!["Do not modify the document set while indexing or searching"]
            }
            Self::FileRead { .. } => vec!["Check that the file exists and you have read permissions"],
            _ => vec![],
        }
    }

    /// True for errors that indicate a broken invariant rather than bad input.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::FileVanished { .. })
    }
}

/// Classified failure to turn one document into lines.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Not a regular file: {path}")]
    NotARegularFile { path: PathBuf },

    #[error("Unsupported or corrupt document '{path}': {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ScanError {
    /// Errors that skip the document without any message.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::NotARegularFile { .. })
    }
}

/// Result type alias for engine operations
pub type DvgResult<T> = Result<T, DvgError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T, DvgError>;

    /// Attach the path of the file that failed to read
    fn read_path(self, path: &std::path::Path) -> Result<T, DvgError>;

    /// Attach the path of the file that failed to write
    fn write_path(self, path: &std::path::Path) -> Result<T, DvgError>;
}

impl<T> ErrorContext<T> for Result<T, std::io::Error> {
    fn context(self, msg: &str) -> Result<T, DvgError> {
        self.map_err(|e| DvgError::General(format!("{msg}: {e}")))
    }

    fn read_path(self, path: &std::path::Path) -> Result<T, DvgError> {
        self.map_err(|source| DvgError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_path(self, path: &std::path::Path) -> Result<T, DvgError> {
        self.map_err(|source| DvgError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}
