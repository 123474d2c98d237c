//! Consistency report of documents against the index.

use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::error::DvgResult;
use crate::index::current_mtime;
use crate::index::format::RecordReader;

/// How a document relates to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// No record of the document.
    NeverIndexed,
    /// A record carries the document's current mtime.
    UpToDate,
    /// Records exist but none carries the current mtime.
    Stale,
}

impl IndexState {
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::NeverIndexed => '-',
            Self::UpToDate => '=',
            Self::Stale => '!',
        }
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Every mtime recorded for each indexed path.
#[derive(Debug, Default)]
pub struct IndexedMtimes(HashMap<String, Vec<i64>>);

impl IndexedMtimes {
    pub fn load<R: BufRead>(reader: R) -> DvgResult<Self> {
        let mut table: HashMap<String, Vec<i64>> = HashMap::new();
        for record in RecordReader::new(reader) {
            let record = record?;
            let mtimes = table.entry(record.path).or_default();
            if !mtimes.contains(&record.mtime) {
                mtimes.push(record.mtime);
            }
        }
        Ok(Self(table))
    }

    #[must_use]
    pub fn state(&self, path: &str, mtime: i64) -> IndexState {
        match self.0.get(path) {
            None => IndexState::NeverIndexed,
            Some(mtimes) if mtimes.contains(&mtime) => IndexState::UpToDate,
            Some(_) => IndexState::Stale,
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub path: String,
    pub mtime: i64,
    pub state: IndexState,
}

impl FileStatus {
    /// The mtime as local `YYYY-mm-dd HH:MM:SS`.
    #[must_use]
    pub fn mtime_display(&self) -> String {
        match Local.timestamp_opt(self.mtime, 0).single() {
            Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.mtime.to_string(),
        }
    }
}

/// Compares the current mtime of `path` with the index.
pub fn file_status(table: &IndexedMtimes, path: &Path) -> DvgResult<FileStatus> {
    let mtime = current_mtime(path)?;
    let key = path.to_string_lossy().into_owned();
    let state = table.state(&key, mtime);
    Ok(FileStatus {
        path: key,
        mtime,
        state,
    })
}
