//! Direct search: scan every document named on the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::document::DocumentSource;
use crate::error::{DvgResult, ScanError};
use crate::pool::WorkerPool;
use crate::search::{
    Ranker, ScoredParagraph, SearchOutcome, SearchProgress, SearchSession, SimilarityFloor,
    windows,
};

/// Results of one chunk of documents.
#[derive(Debug)]
pub(crate) struct ChunkResult {
    pub paragraphs: Vec<ScoredParagraph>,
    pub documents: usize,
}

/// Searches `documents` for paragraphs similar to the session's query.
///
/// Unreadable documents are skipped with a warning; directories and other
/// non-regular files silently. An interrupted search returns the results
/// gathered so far with `cancelled` set.
pub fn search<I, P>(
    session: &SearchSession,
    source: &dyn DocumentSource,
    documents: I,
    pool: &WorkerPool,
    mut progress: P,
) -> DvgResult<SearchOutcome>
where
    I: Iterator<Item = DvgResult<PathBuf>> + Send,
    P: FnMut(SearchProgress<'_>),
{
    let config = session.config();
    let floor = SimilarityFloor::new();
    let mut ranker = Ranker::new(config.top_k(), &floor);
    let mut scanned = 0usize;

    let outcome = pool.run(
        documents,
        |_| 1,
        |paths: Vec<PathBuf>| {
            let scorer = session.scorer(&floor);
            let mut local = Ranker::new(config.top_k(), &floor);
            for path in &paths {
                let Some(lines) = scan_or_skip(source, path) else {
                    continue;
                };
                let path: Arc<Path> = Arc::from(path.as_path());
                let ranges = windows(lines.len(), config.window());
                local.merge(scorer.score_document(&path, &lines, ranges));
            }
            Ok(ChunkResult {
                paragraphs: local.into_results(),
                documents: paths.len(),
            })
        },
        |chunk| {
            scanned += chunk.documents;
            ranker.merge(chunk.paragraphs);
            progress(SearchProgress {
                documents: scanned,
                best: ranker.best(),
            });
            Ok(())
        },
    )?;

    Ok(SearchOutcome {
        results: ranker.into_results(),
        documents: scanned,
        cancelled: outcome.cancelled,
    })
}

/// Scans a document, logging and swallowing per-document failures.
pub(crate) fn scan_or_skip(source: &dyn DocumentSource, path: &Path) -> Option<Arc<[String]>> {
    match source.scan(path) {
        Ok(lines) => Some(lines),
        Err(e) if e.is_silent() => None,
        Err(e @ ScanError::NotFound { .. }) => {
            tracing::warn!("skipping document: {e}");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "skipping document: {e}");
            None
        }
    }
}
