//! Input/Output handling for the CLI.
//!
//! This module provides:
//! - Result and report formatting (text, quoted paragraphs, JSON)
//! - Consistent error reporting and exit codes

pub mod exit_code;
pub mod output;

pub use exit_code::ExitCode;
pub use output::{OutputFormat, OutputManager, RESULT_HEADER, STATUS_HEADER, location};
