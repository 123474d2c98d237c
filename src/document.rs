//! Document sources: turn a path into an ordered sequence of text lines.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use crate::error::ScanError;

/// Produces the lines of a document.
pub trait DocumentSource: Send + Sync {
    fn scan(&self, path: &Path) -> Result<Arc<[String]>, ScanError>;
}

/// Reads UTF-8 plain-text files.
///
/// Directories and other non-regular files are rejected with
/// [`ScanError::NotARegularFile`]; files containing NUL bytes or invalid UTF-8
/// are reported as unsupported. Line terminators (`\n` or `\r\n`) are removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextScanner;

impl DocumentSource for TextScanner {
    fn scan(&self, path: &Path) -> Result<Arc<[String]>, ScanError> {
        let metadata = std::fs::metadata(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ScanError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ScanError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        if !metadata.is_file() {
            return Err(ScanError::NotARegularFile {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.contains(&0) {
            return Err(ScanError::Unsupported {
                path: path.to_path_buf(),
                reason: "binary content".to_string(),
            });
        }
        let text = String::from_utf8(bytes).map_err(|e| ScanError::Unsupported {
            path: path.to_path_buf(),
            reason: format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
        })?;

        Ok(text_to_lines(&text))
    }
}

/// Splits text into lines without their terminators.
#[must_use]
pub fn text_to_lines(text: &str) -> Arc<[String]> {
    text.lines().map(str::to_string).collect()
}
