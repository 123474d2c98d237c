//! Index build.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::NamedTempFile;

use crate::document::DocumentSource;
use crate::error::{DvgError, DvgResult, ErrorContext};
use crate::index::current_mtime;
use crate::index::fingerprint::Fingerprint;
use crate::index::format::IndexRecord;
use crate::pool::WorkerPool;
use crate::search::direct::scan_or_skip;
use crate::search::windows;
use crate::tokenize::Tokenizer;
use crate::vector::ScdvModel;

/// Suffix of the sidecar file listing documents without indexable paragraphs.
pub const UNINDEXED_SUFFIX: &str = "unindexed";

/// Counters of one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Documents handed to the workers.
    pub documents: usize,
    /// Records written.
    pub records: usize,
    /// Documents that produced no record, listed in the sidecar file.
    pub unindexed: Vec<String>,
    /// Paths that cannot be represented in the index.
    pub skipped: usize,
    /// The build was interrupted and the previous index kept.
    pub cancelled: bool,
}

/// Records of one document, in window order.
struct DocumentRecords {
    key: String,
    records: Vec<IndexRecord>,
}

/// Builds the index of `documents` at `index_path`.
///
/// The index is written to a temporary file next to `index_path` and only
/// replaces it when the build completes. A cancelled build leaves the
/// previous index untouched.
#[allow(clippy::too_many_arguments)]
pub fn build_index<I, P>(
    model: ScdvModel,
    tokenizer: &dyn Tokenizer,
    source: &dyn DocumentSource,
    documents: I,
    window: usize,
    index_path: &Path,
    pool: &WorkerPool,
    mut progress: P,
) -> DvgResult<BuildSummary>
where
    I: Iterator<Item = DvgResult<PathBuf>> + Send,
    P: FnMut(&BuildSummary),
{
    let index_dir = index_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(index_dir).write_path(index_dir)?;

    let temp = NamedTempFile::new_in(index_dir).write_path(index_dir)?;
    let mut out = BufWriter::new(temp);
    let model = model.into_shared()?;
    let mut summary = BuildSummary::default();

    let skipped = AtomicUsize::new(0);
    let keyed = documents.filter_map(|doc| match doc {
        Ok(path) => match index_key(&path) {
            Some(key) => Some(Ok((key, path))),
            None => {
                skipped.fetch_add(1, Ordering::Relaxed);
                None
            }
        },
        Err(e) => Some(Err(e)),
    });

    let outcome = pool.run(
        keyed,
        |_| 1,
        |chunk: Vec<(String, PathBuf)>| {
            chunk
                .into_iter()
                .map(|(key, path)| {
                    let mtime = current_mtime(&path)?;
                    let records = match scan_or_skip(source, &path) {
                        Some(lines) => windows(lines.len(), window)
                            .filter_map(|range| {
                                let tokens: Vec<String> = lines[range.start..range.end]
                                    .iter()
                                    .flat_map(|l| tokenizer.tokenize(l))
                                    .collect();
                                let fingerprint =
                                    Fingerprint::from_weights(&model.cluster_weights(&tokens));
                                (!fingerprint.is_empty()).then(|| IndexRecord {
                                    path: key.clone(),
                                    mtime,
                                    range,
                                    fingerprint,
                                })
                            })
                            .collect(),
                        None => Vec::new(),
                    };
                    Ok(DocumentRecords { key, records })
                })
                .collect::<DvgResult<Vec<_>>>()
        },
        |docs| {
            for doc in docs {
                summary.documents += 1;
                if doc.records.is_empty() {
                    summary.unindexed.push(doc.key);
                    continue;
                }
                for record in &doc.records {
                    writeln!(out, "{record}").write_path(index_path)?;
                }
                summary.records += doc.records.len();
            }
            progress(&summary);
            Ok(())
        },
    )?;
    drop(model);
    summary.skipped = skipped.load(Ordering::Relaxed);

    if outcome.cancelled {
        tracing::warn!("index build interrupted, keeping the previous index");
        summary.cancelled = true;
        return Ok(summary);
    }

    let temp = out
        .into_inner()
        .map_err(|e| DvgError::FileWrite {
            path: index_path.to_path_buf(),
            source: e.into_error(),
        })?;
    temp.persist(index_path).map_err(|e| DvgError::FileWrite {
        path: index_path.to_path_buf(),
        source: e.error,
    })?;

    write_unindexed(&unindexed_path(index_path), &summary.unindexed)?;
    tracing::info!(
        documents = summary.documents,
        records = summary.records,
        unindexed = summary.unindexed.len(),
        "index written to {}",
        index_path.display()
    );
    Ok(summary)
}

/// `<index file>.unindexed`
#[must_use]
pub fn unindexed_path(index_path: &Path) -> PathBuf {
    let mut name = index_path.as_os_str().to_os_string();
    name.push(".");
    name.push(UNINDEXED_SUFFIX);
    PathBuf::from(name)
}

fn write_unindexed(path: &Path, keys: &[String]) -> DvgResult<()> {
    if keys.is_empty() {
        return match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(DvgError::FileWrite {
                path: path.to_path_buf(),
                source: e,
            }),
            _ => Ok(()),
        };
    }
    let mut text = keys.join("\n");
    text.push('\n');
    std::fs::write(path, text).write_path(path)
}

/// The index key of a document path, or `None` when the record format
/// cannot hold it.
fn index_key(path: &Path) -> Option<String> {
    match path.to_str() {
        Some(key) if !key.contains(['\t', '\n', '\r']) && !key.is_empty() => Some(key.to_string()),
        _ => {
            tracing::warn!(path = %path.display(), "skipping document: path cannot be indexed");
            None
        }
    }
}
