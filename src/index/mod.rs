//! Approximate cluster index.
//!
//! Every indexed paragraph is reduced to a [`Fingerprint`] of its dominant
//! clusters. At query time the index is streamed instead of the documents:
//! stale records and records whose fingerprint cannot contribute enough of
//! the query's cluster mass are dropped before any document is opened.

pub mod builder;
pub mod fingerprint;
pub mod format;
pub mod query;
pub mod scan;
pub mod status;

use std::path::{Path, PathBuf};

pub use builder::{BuildSummary, UNINDEXED_SUFFIX, build_index, unindexed_path};
pub use fingerprint::{ClusterDecile, Fingerprint};
pub use format::{IndexRecord, RecordReader};
pub use query::{query_weights, search};
pub use scan::{DocumentGroup, IndexScanner, MTIME_TOLERANCE};
pub use status::{FileStatus, IndexState, IndexedMtimes, file_status};

use crate::error::{DvgError, DvgResult, ErrorContext};
use crate::paths::require_normalized_relative;

/// Extension of index files.
pub const INDEX_EXTENSION: &str = "clu";

/// `<index_dir>/<model file name>.w<window>.clu`
#[must_use]
pub fn index_file_path(index_dir: &Path, model_file_name: &str, window: usize) -> PathBuf {
    index_dir.join(format!("{model_file_name}.w{window}.{INDEX_EXTENSION}"))
}

/// Modification time in whole seconds since the Unix epoch.
pub fn mtime_seconds(path: &Path) -> std::io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let seconds = match modified.duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    };
    Ok(seconds)
}

/// Modification time of a document the index refers to. A missing file here
/// means it disappeared during the run.
pub(crate) fn current_mtime(path: &Path) -> DvgResult<i64> {
    mtime_seconds(path).map_err(|_| DvgError::FileVanished {
        path: path.to_path_buf(),
    })
}

/// Validates the file arguments of the index commands.
pub fn check_file_args<S: AsRef<str>>(args: &[S]) -> DvgResult<()> {
    args.iter()
        .map(AsRef::as_ref)
        .filter(|a| *a != crate::paths::STDIN_ARG)
        .try_for_each(require_normalized_relative)
}

/// Fails with [`DvgError::IndexMissing`] unless `path` is an existing file.
pub fn require_index(path: &Path) -> DvgResult<std::fs::File> {
    if !path.is_file() {
        return Err(DvgError::IndexMissing {
            path: path.to_path_buf(),
        });
    }
    std::fs::File::open(path).read_path(path)
}
