//! Sliding paragraph windows over a document's lines.

use serde::Serialize;

/// Half-open line range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when the two ranges share at least one line.
    #[must_use]
    pub const fn overlaps(&self, other: &LineRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Iterator over the paragraph windows of a document.
///
/// Windows overlap by half: for `window_size` w the start advances by `w / 2`
/// and the last window always ends at `line_count`. A document no longer than
/// one window yields a single range; `window_size == 1` yields every line.
#[derive(Debug, Clone)]
pub struct Windows {
    line_count: usize,
    window_size: usize,
    pos: usize,
    done: bool,
}

/// Windows of `window_size` lines over `line_count` lines.
///
/// `window_size` of zero is treated as one.
#[must_use]
pub fn windows(line_count: usize, window_size: usize) -> Windows {
    Windows {
        line_count,
        window_size: window_size.max(1),
        pos: 0,
        done: false,
    }
}

impl Iterator for Windows {
    type Item = LineRange;

    fn next(&mut self) -> Option<LineRange> {
        if self.done {
            return None;
        }
        let w = self.window_size;
        let n = self.line_count;

        if w == 1 {
            if self.pos >= n {
                self.done = true;
                return None;
            }
            let r = LineRange::new(self.pos, self.pos + 1);
            self.pos += 1;
            return Some(r);
        }

        if n <= w {
            self.done = true;
            return Some(LineRange::new(0, n));
        }

        let step = w / 2;
        let stride = w - step;
        if self.pos >= n - stride {
            self.done = true;
            return None;
        }
        let r = LineRange::new(self.pos, (self.pos + w).min(n));
        self.pos += step;
        Some(r)
    }
}
