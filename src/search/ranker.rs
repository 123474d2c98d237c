//! Overlap resolution, per-document reduction and the bounded top-K merge.
//!
//! The ranker keeps at most `2K` results while the similarity floor is still
//! at its initial value and `K` once it has been raised. Whenever the list is
//! trimmed down to `K` entries, the K-th score becomes the new floor. The
//! floor is shared by every worker of a query and only ever rises, so each
//! merged batch lets all later paragraphs be rejected earlier.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use crate::search::ScoredParagraph;

/// Minimum similarity a paragraph needs before any result has been ranked.
pub const INITIAL_SIMILARITY_FLOOR: f32 = 0.5;

/// Monotonic minimum similarity shared across workers.
#[derive(Debug)]
pub struct SimilarityFloor(AtomicU32);

impl Default for SimilarityFloor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityFloor {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU32::new(INITIAL_SIMILARITY_FLOOR.to_bits()))
    }

    #[must_use]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(AtomicOrdering::Acquire))
    }

    /// Raises the floor to `value` if that is higher. Returns the floor in effect.
    pub fn raise(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.get();
        }
        let previous = self
            .0
            .fetch_update(AtomicOrdering::AcqRel, AtomicOrdering::Acquire, |bits| {
                (value > f32::from_bits(bits)).then_some(value.to_bits())
            });
        match previous {
            Ok(_) => value,
            Err(bits) => f32::from_bits(bits),
        }
    }

    /// True once the floor has moved above its initial value.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.get() > INITIAL_SIMILARITY_FLOOR
    }
}

/// Orders by score, then length, then position; higher first when sorting
/// with [`sort_descending`].
pub fn rank_order(a: &ScoredParagraph, b: &ScoredParagraph) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then(a.chars.cmp(&b.chars))
        .then(a.range.cmp(&b.range))
}

pub fn sort_descending(results: &mut [ScoredParagraph]) {
    results.sort_by(|a, b| rank_order(b, a));
}

/// Sorts descending and keeps the best `k`.
pub fn trim(results: &mut Vec<ScoredParagraph>, k: usize) {
    sort_descending(results);
    results.truncate(k);
}

/// Drops the lower-scoring member of every overlapping adjacent pair.
///
/// `candidates` must be ordered by start line. Pairs are examined once, left
/// to right, on the original sequence: a paragraph between two others may be
/// dropped while its neighbours both survive. On equal scores the later
/// paragraph is dropped.
#[must_use]
pub fn resolve_overlaps(candidates: Vec<ScoredParagraph>) -> Vec<ScoredParagraph> {
    let mut dropped = vec![false; candidates.len()];
    for (i, pair) in candidates.windows(2).enumerate() {
        let (first, second) = (&pair[0], &pair[1]);
        if first.range.overlaps(&second.range) {
            if first.score < second.score {
                dropped[i] = true;
            } else {
                dropped[i + 1] = true;
            }
        }
    }
    candidates
        .into_iter()
        .zip(dropped)
        .filter_map(|(c, d)| (!d).then_some(c))
        .collect()
}

/// Reduces one document's surviving paragraphs.
///
/// In paragraph search the non-overlapping best `top_k` are kept; otherwise
/// only the single best paragraph represents the document.
#[must_use]
pub fn reduce_document(
    candidates: Vec<ScoredParagraph>,
    paragraph_search: bool,
    top_k: usize,
) -> Vec<ScoredParagraph> {
    if paragraph_search {
        let mut kept = resolve_overlaps(candidates);
        trim(&mut kept, top_k);
        kept
    } else {
        candidates
            .into_iter()
            .max_by(rank_order)
            .into_iter()
            .collect()
    }
}

/// Bounded top-K result list feeding a shared [`SimilarityFloor`].
#[derive(Debug)]
pub struct Ranker<'a> {
    results: Vec<ScoredParagraph>,
    top_k: usize,
    floor: &'a SimilarityFloor,
}

impl<'a> Ranker<'a> {
    #[must_use]
    pub fn new(top_k: usize, floor: &'a SimilarityFloor) -> Self {
        Self {
            results: Vec::with_capacity(top_k.saturating_mul(2)),
            top_k: top_k.max(1),
            floor,
        }
    }

    /// Adds a batch of paragraphs and trims when the list grew too long.
    pub fn merge(&mut self, batch: Vec<ScoredParagraph>) {
        self.results.extend(batch);
        let limit = if self.floor.is_raised() {
            self.top_k
        } else {
            self.top_k.saturating_mul(2)
        };
        if self.results.len() > limit {
            trim(&mut self.results, self.top_k);
            if self.results.len() == self.top_k {
                self.floor.raise(self.results[self.top_k - 1].score);
            }
        }
    }

    /// Current best paragraph.
    #[must_use]
    pub fn best(&self) -> Option<&ScoredParagraph> {
        self.results.iter().max_by(|a, b| rank_order(a, b))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Final results, best first, at most `top_k`.
    #[must_use]
    pub fn into_results(mut self) -> Vec<ScoredParagraph> {
        trim(&mut self.results, self.top_k);
        self.results
    }
}
