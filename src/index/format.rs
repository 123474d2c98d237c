//! Index record lines.
//!
//! ```text
//! <document-path>\t<mtime-seconds>\t<start>-<end>\t<fingerprint>
//! ```
//!
//! Records of one document are contiguous. Paths are relative and never
//! contain tabs or newlines.

use std::fmt;
use std::io::BufRead;

use crate::error::{DvgError, DvgResult};
use crate::index::fingerprint::Fingerprint;
use crate::search::LineRange;

/// One indexed paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub path: String,
    pub mtime: i64,
    pub range: LineRange,
    pub fingerprint: Fingerprint,
}

impl IndexRecord {
    /// Parses one record line. `line_no` is 1-based and only used in errors.
    pub fn parse(line: &str, line_no: usize) -> DvgResult<Self> {
        let corrupted = |reason: String| DvgError::IndexCorrupted {
            line: line_no,
            reason,
        };

        let mut fields = line.split('\t');
        let (Some(path), Some(mtime), Some(range), Some(fingerprint), None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return Err(corrupted("expected 4 tab-separated fields".to_string()));
        };

        if path.is_empty() {
            return Err(corrupted("empty document path".to_string()));
        }
        let mtime = mtime
            .parse()
            .map_err(|_| corrupted(format!("invalid mtime '{mtime}'")))?;
        let range = parse_range(range).ok_or_else(|| corrupted(format!("invalid range '{range}'")))?;
        let fingerprint = Fingerprint::decode(fingerprint).map_err(corrupted)?;

        Ok(Self {
            path: path.to_string(),
            mtime,
            range,
            fingerprint,
        })
    }
}

impl fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.path, self.mtime, self.range, self.fingerprint
        )
    }
}

fn parse_range(text: &str) -> Option<LineRange> {
    let (start, end) = text.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end: usize = end.parse().ok()?;
    (start <= end).then(|| LineRange::new(start, end))
}

/// Streams records from an index file. Blank lines are ignored.
pub struct RecordReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = DvgResult<IndexRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Some(IndexRecord::parse(&line, self.line_no)),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
