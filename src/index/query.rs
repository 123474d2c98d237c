//! Index-accelerated search.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::document::DocumentSource;
use crate::error::DvgResult;
use crate::index::require_index;
use crate::index::scan::{DocumentGroup, IndexScanner};
use crate::paths::FileMatcher;
use crate::pool::WorkerPool;
use crate::search::direct::{ChunkResult, scan_or_skip};
use crate::search::{Ranker, SearchOutcome, SearchProgress, SearchSession, SimilarityFloor};
use crate::tokenize::Tokenizer;
use crate::vector::ScdvModel;

/// Cluster weight profile of the query under the unspecialized model.
///
/// Index fingerprints are built against the full cluster set, so this has to
/// be computed before the model is specialized for the query.
pub fn query_weights(model: &ScdvModel, tokenizer: &dyn Tokenizer, query: &str) -> Vec<f32> {
    model.cluster_weights(&tokenizer.tokenize(query))
}

/// Searches the documents of `index_path` that match `files`.
///
/// Only paragraphs whose record is fresh and passes the over-pruning ratio
/// are read and scored. Fails with an index missing error when there is no
/// index file.
pub fn search<P>(
    session: &SearchSession,
    weights: &[f32],
    index_path: &Path,
    files: &FileMatcher,
    source: &dyn DocumentSource,
    pool: &WorkerPool,
    mut progress: P,
) -> DvgResult<SearchOutcome>
where
    P: FnMut(SearchProgress<'_>),
{
    let config = session.config();
    let reader = BufReader::new(require_index(index_path)?);
    let groups = IndexScanner::new(reader, files, weights, config.over_pruning());

    let floor = SimilarityFloor::new();
    let mut ranker = Ranker::new(config.top_k(), &floor);
    let mut scanned = 0usize;

    let outcome = pool.run(
        groups,
        |group: &DocumentGroup| group.ranges.len(),
        |groups: Vec<DocumentGroup>| {
            let scorer = session.scorer(&floor);
            let mut local = Ranker::new(config.top_k(), &floor);
            let documents = groups.len();
            for group in groups.into_iter().filter(|g| !g.ranges.is_empty()) {
                let path = PathBuf::from(group.path);
                let Some(lines) = scan_or_skip(source, &path) else {
                    continue;
                };
                let path: Arc<Path> = Arc::from(path);
                local.merge(scorer.score_document(&path, &lines, group.ranges));
            }
            Ok(ChunkResult {
                paragraphs: local.into_results(),
                documents,
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
