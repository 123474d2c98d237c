//! Paragraph scoring against a query vector.

use std::path::Path;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::search::ranker::{SimilarityFloor, reduce_document};
use crate::search::{LineRange, ScoredParagraph};
use crate::tokenize::Tokenizer;
use crate::vector::{DocVector, ScdvModel};

/// Scores windows of one query. Cheap to build; one per worker.
pub struct Scorer<'a> {
    model: &'a ScdvModel,
    query: &'a DocVector,
    tokenizer: &'a dyn Tokenizer,
    config: &'a SearchConfig,
    floor: &'a SimilarityFloor,
}

impl<'a> Scorer<'a> {
    #[must_use]
    pub fn new(
        model: &'a ScdvModel,
        query: &'a DocVector,
        tokenizer: &'a dyn Tokenizer,
        config: &'a SearchConfig,
        floor: &'a SimilarityFloor,
    ) -> Self {
        Self {
            model,
            query,
            tokenizer,
            config,
            floor,
        }
    }

    /// Cosine similarity between the query and a run of lines.
    pub fn similarity<S: AsRef<str>>(&self, lines: &[S]) -> f32 {
        similarity(self.model, self.query, self.tokenizer, lines)
    }

    /// Scores one window, or `None` when it is filtered out or below the floor.
    pub fn score_window(
        &self,
        path: &Arc<Path>,
        lines: &Arc<[String]>,
        range: LineRange,
    ) -> Option<ScoredParagraph> {
        let para = lines.get(range.start..range.end)?;
        if !self.config.filter().accepts(para) {
            return None;
        }

        let mut score = self.similarity(para);
        if score < self.floor.get() {
            return None;
        }

        let chars: usize = para.iter().map(|l| l.chars().count()).sum();
        let min_length = self.config.min_length();
        if chars < min_length {
            score *= chars as f32 / min_length as f32;
            if score < self.floor.get() {
                return None;
            }
        }

        Some(ScoredParagraph {
            score,
            chars,
            range,
            lines: Arc::clone(lines),
            path: Arc::clone(path),
        })
    }

    /// Scores the given windows of a document in order and reduces the
    /// survivors to the paragraphs that represent the document.
    pub fn score_document<I>(
        &self,
        path: &Arc<Path>,
        lines: &Arc<[String]>,
        ranges: I,
    ) -> Vec<ScoredParagraph>
    where
        I: IntoIterator<Item = LineRange>,
    {
        let candidates: Vec<ScoredParagraph> = ranges
            .into_iter()
            .filter_map(|range| self.score_window(path, lines, range))
            .collect();
        if candidates.is_empty() {
            return candidates;
        }
        reduce_document(
            candidates,
            self.config.paragraph_search(),
            self.config.top_k(),
        )
    }
}

/// Embeds the tokens of all `lines` together and compares them to `query`.
pub fn similarity<S: AsRef<str>>(
    model: &ScdvModel,
    query: &DocVector,
    tokenizer: &dyn Tokenizer,
    lines: &[S],
) -> f32 {
    let tokens: Vec<String> = lines
        .iter()
        .flat_map(|l| tokenizer.tokenize(l.as_ref()))
        .collect();
    model.embed(&tokens).inner(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchOverrides, Settings};
    use crate::search::window::windows;
    use crate::tokenize::WhitespaceTokenizer;
    use crate::vector::toy_model;

    fn config(min_length: usize, paragraph_search: bool) -> SearchConfig {
        SearchConfig::new(
            &Settings::default(),
            SearchOverrides {
                min_length: Some(min_length),
                paragraph_search,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn doc(lines: &[&str]) -> Arc<[String]> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_similarity_of_exact_word() {
        let model = toy_model();
        let query = model.embed(&["a"]);
        let config = config(0, false);
        let floor = SimilarityFloor::new();
        let scorer = Scorer::new(&model, &query, &WhitespaceTokenizer, &config, &floor);

        assert!((scorer.similarity(&["a"]) - 1.0).abs() < 1e-6);
        assert_eq!(scorer.similarity(&["c"]), 0.0);
    }

    #[test]
    fn test_short_paragraph_penalty() {
        let model = toy_model();
        let query = model.embed(&["a"]);
        let floor = SimilarityFloor::new();
        let path: Arc<Path> = Arc::from(Path::new("a.txt"));
        let lines = doc(&["a a a a"]);

        let lenient = config(0, false);
        let scorer = Scorer::new(&model, &query, &WhitespaceTokenizer, &lenient, &floor);
        let full = scorer.score_window(&path, &lines, LineRange::new(0, 1)).unwrap();
        assert!((full.score - 1.0).abs() < 1e-6);
        assert_eq!(full.chars, 7);

        // 7 chars against a 10 char minimum: 0.7 survives the 0.5 floor
        let strict = config(10, false);
        let scorer = Scorer::new(&model, &query, &WhitespaceTokenizer, &strict, &floor);
        let penalized = scorer.score_window(&path, &lines, LineRange::new(0, 1)).unwrap();
        assert!((penalized.score - 0.7).abs() < 1e-6);

        // 7 / 20 = 0.35 falls below it
        let stricter = config(20, false);
        let scorer = Scorer::new(&model, &query, &WhitespaceTokenizer, &stricter, &floor);
        assert!(scorer.score_window(&path, &lines, LineRange::new(0, 1)).is_none());
    }

    #[test]
    fn test_floor_rejects_weak_windows() {
        let model = toy_model();
        let query = model.embed(&["a"]);
        let config = config(0, true);
        let floor = SimilarityFloor::new();
        let scorer = Scorer::new(&model, &query, &WhitespaceTokenizer, &config, &floor);
        let path: Arc<Path> = Arc::from(Path::new("a.txt"));
        let lines = doc(&["c", "a", "c", "c", "a"]);

        let found = scorer.score_document(&path, &lines, windows(lines.len(), 1));
        let starts: Vec<usize> = found.iter().map(|p| p.range.start).collect();
        assert_eq!(starts.len(), 2);
        assert!(starts.contains(&1) && starts.contains(&4));

        floor.raise(1.5);
        assert!(scorer.score_document(&path, &lines, windows(lines.len(), 1)).is_empty());
    }
}
