//! Paragraph search shared by direct and index-accelerated queries.
//!
//! # Pipeline
//! A [`SearchSession`] embeds the query, specializes the model for it and
//! publishes the specialized matrix into a shared region. Documents are then
//! cut into [`windows`], scored by a [`Scorer`], reduced per document and
//! merged through a [`Ranker`] whose similarity floor rises as better results
//! are found.

pub mod direct;
pub mod excerpt;
pub mod filter;
pub mod ranker;
pub mod scorer;
pub mod window;

use std::path::Path;
use std::sync::Arc;

pub use excerpt::excerpt;
pub use filter::TextFilter;
pub use ranker::{
    INITIAL_SIMILARITY_FLOOR, Ranker, SimilarityFloor, reduce_document, resolve_overlaps,
};
pub use scorer::Scorer;
pub use window::{LineRange, Windows, windows};

use crate::config::SearchConfig;
use crate::error::DvgResult;
use crate::tokenize::Tokenizer;
use crate::vector::{DocVector, ScdvModel, SharedModel};

/// A scored paragraph of one document.
#[derive(Debug, Clone)]
pub struct ScoredParagraph {
    /// Similarity to the query, after the short-paragraph penalty.
    pub score: f32,
    /// Total characters of the paragraph's lines.
    pub chars: usize,
    pub range: LineRange,
    /// All lines of the owning document, shared by its paragraphs.
    pub lines: Arc<[String]>,
    pub path: Arc<Path>,
}

impl ScoredParagraph {
    /// The paragraph's own lines.
    #[must_use]
    pub fn paragraph(&self) -> &[String] {
        self.lines.get(self.range.start..self.range.end).unwrap_or(&[])
    }
}

/// Final results of a search.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Best paragraphs first, at most `top_k`.
    pub results: Vec<ScoredParagraph>,
    /// Documents scanned (or skipped) before the search ended.
    pub documents: usize,
    /// The search was interrupted; `results` covers the documents seen so far.
    pub cancelled: bool,
}

/// Intermediate state reported after every merged chunk.
#[derive(Debug, Clone, Copy)]
pub struct SearchProgress<'a> {
    pub documents: usize,
    pub best: Option<&'a ScoredParagraph>,
}

/// One query against one model, ready to be fanned out to workers.
pub struct SearchSession {
    model: SharedModel,
    query: DocVector,
    tokenizer: Arc<dyn Tokenizer>,
    config: SearchConfig,
}

impl SearchSession {
    /// Embeds `query`, specializes `model` for it and publishes the result.
    ///
    /// Fails with a query vector error when the query carries no topic of the
    /// model.
    pub fn prepare(
        model: ScdvModel,
        tokenizer: Arc<dyn Tokenizer>,
        query: &str,
        config: SearchConfig,
    ) -> DvgResult<Self> {
        let tokens = tokenizer.tokenize(query);
        let oov = model.find_oov_tokens(&tokens);
        if !oov.is_empty() {
            tracing::info!(tokens = ?oov, "query words not in the model vocabulary");
        }

        let query_vec = model.embed(&tokens);
        let model = model.specialize_for_query(&query_vec)?;
        let query = model.embed(&tokens);
        let model = model.into_shared()?;

        Ok(Self {
            model,
            query,
            tokenizer,
            config,
        })
    }

    /// A scorer bound to this session and `floor`.
    #[must_use]
    pub fn scorer<'a>(&'a self, floor: &'a SimilarityFloor) -> Scorer<'a> {
        Scorer::new(
            &self.model,
            &self.query,
            self.tokenizer.as_ref(),
            &self.config,
            floor,
        )
    }

    /// Similarity of arbitrary lines to the query, ignoring filters and floor.
    pub fn similarity<S: AsRef<str>>(&self, lines: &[S]) -> f32 {
        scorer::similarity(&self.model, &self.query, self.tokenizer.as_ref(), lines)
    }

    /// Excerpt of `paragraph` most similar to the query.
    #[must_use]
    pub fn excerpt(&self, paragraph: &ScoredParagraph) -> String {
        excerpt(paragraph.paragraph(), self.config.excerpt_length(), |run| {
            self.similarity(run)
        })
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[must_use]
    pub fn model(&self) -> &ScdvModel {
        &self.model
    }

    #[must_use]
    pub fn query(&self) -> &DocVector {
        &self.query
    }
}
