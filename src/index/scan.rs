//! Query-time streaming of index records.
//!
//! Records are grouped on "path changed" transitions. The format guarantees
//! that the records of one document are contiguous; a path showing up again
//! after another one only costs an extra stat and is logged.
//!
//! Detecting that keeps every matched path in memory until the scan ends, so
//! the cost grows with the number of documents the query selects. Paths that
//! no file argument matches are neither stat'ed nor remembered.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use crate::error::DvgResult;
use crate::index::current_mtime;
use crate::index::format::{IndexRecord, RecordReader};
use crate::paths::FileMatcher;
use crate::search::LineRange;

/// Records whose stored mtime is this many seconds or more away from the
/// file's current mtime are stale.
pub const MTIME_TOLERANCE: i64 = 3;

/// Surviving paragraphs of one contiguous run of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentGroup {
    pub path: String,
    /// Current mtime of the document.
    pub mtime: i64,
    /// Paragraphs that passed the staleness and pruning checks, may be empty.
    pub ranges: Vec<LineRange>,
}

/// Streams [`DocumentGroup`]s of the documents matching the file arguments.
pub struct IndexScanner<'a, R> {
    records: RecordReader<R>,
    matcher: &'a FileMatcher,
    query_weights: &'a [f32],
    ratio: f32,
    pending: Option<IndexRecord>,
    /// Matched paths already grouped.
    seen: HashSet<String>,
    done: bool,
}

impl<'a, R: BufRead> IndexScanner<'a, R> {
    /// `ratio` is the over-pruning ratio: records whose expected contribution
    /// to the query falls below it are dropped.
    pub fn new(reader: R, matcher: &'a FileMatcher, query_weights: &'a [f32], ratio: f32) -> Self {
        Self {
            records: RecordReader::new(reader),
            matcher,
            query_weights,
            ratio,
            pending: None,
            seen: HashSet::new(),
            done: false,
        }
    }

    fn next_record(&mut self) -> Option<DvgResult<IndexRecord>> {
        self.pending.take().map(Ok).or_else(|| self.records.next())
    }

    fn accepts(&self, record: &IndexRecord, current: i64) -> bool {
        if (record.mtime - current).abs() >= MTIME_TOLERANCE {
            return false;
        }
        record.fingerprint.expected_contribution(self.query_weights) >= self.ratio
    }

    fn next_group(&mut self) -> DvgResult<Option<DocumentGroup>> {
        loop {
            let first = match self.next_record() {
                Some(record) => record?,
                None => return Ok(None),
            };

            let path = first.path.clone();
            let current = if self.matcher.matches(&path) {
                if !self.seen.insert(path.clone()) {
                    tracing::warn!(path = %path, "index records of one document are not contiguous");
                }
                Some(current_mtime(Path::new(&path))?)
            } else {
                None
            };

            let mut ranges = Vec::new();
            let mut record = Some(first);
            while let Some(r) = record.take() {
                if r.path != path {
                    self.pending = Some(r);
                    break;
                }
                if let Some(current) = current {
                    if self.accepts(&r, current) {
                        ranges.push(r.range);
                    }
                }
                record = self.records.next().transpose()?;
            }

            if let Some(mtime) = current {
                return Ok(Some(DocumentGroup {
                    path,
                    mtime,
                    ranges,
                }));
            }
        }
    }
}

impl<R: BufRead> Iterator for IndexScanner<'_, R> {
    type Item = DvgResult<DocumentGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_group() {
            Ok(Some(group)) => Some(Ok(group)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
