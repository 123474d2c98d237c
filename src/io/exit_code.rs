//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - search completed, including interrupted searches that
//!   printed partial results
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - internal consistency failure
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::error::DvgError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Internal consistency violated, e.g. a file vanished mid-run (code 2)
    BlockingError = 2,

    /// Model or index not found (code 3)
    NotFound = 3,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration or argument error (code 6)
    ConfigError = 6,

    /// Index corruption detected (code 7)
    IndexCorrupted = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// Maps a library error to the exit code scripts can act on.
    pub fn from_error(error: &DvgError) -> Self {
        match error {
            DvgError::ModelNotFound { .. } | DvgError::IndexMissing { .. } => ExitCode::NotFound,

            DvgError::IndexCorrupted { .. } => ExitCode::IndexCorrupted,

            DvgError::FileVanished { .. } => ExitCode::BlockingError,

            DvgError::FileRead { .. } | DvgError::FileWrite { .. } | DvgError::Io(_) => {
                ExitCode::IoError
            }

            DvgError::Config { .. }
            | DvgError::InvalidPath { .. }
            | DvgError::UnknownTokenizer { .. }
            | DvgError::ModelSpec { .. } => ExitCode::ConfigError,

            _ => ExitCode::GeneralError,
        }
    }

    /// Exit code of a top-level `anyhow` error.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        error
            .downcast_ref::<DvgError>()
            .map_or(ExitCode::GeneralError, Self::from_error)
    }

    /// Blocking errors should halt automation pipelines.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Blocking error - automation should halt",
            ExitCode::NotFound => "Not found",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::IndexCorrupted => "Index corrupted",
        }
    }
}
