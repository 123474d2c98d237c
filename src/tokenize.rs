//! Tokenizers selected by language tag.
//!
//! A model is trained with one tokenizer; queries and documents must be split
//! the same way. Unknown tags fail at startup, never per document.

use std::sync::Arc;

use regex::Regex;

use crate::error::{DvgError, DvgResult};

/// Splits text into token strings.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Language tag this tokenizer is registered under.
    fn name(&self) -> &'static str;
}

/// Word tokenizer for English: lowercased words (with inner `'` or `-`),
/// numbers, and every punctuation character as its own token.
#[derive(Debug)]
pub struct EnglishTokenizer {
    pattern: Regex,
}

impl EnglishTokenizer {
    pub fn new() -> DvgResult<Self> {
        let pattern = Regex::new(r"\w+(?:['\-]\w+)*|[^\w\s]")
            .map_err(|e| DvgError::General(format!("Failed to compile tokenizer pattern: {e}")))?;
        Ok(Self { pattern })
    }
}

impl Tokenizer for EnglishTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    fn name(&self) -> &'static str {
        "en"
    }
}

/// Splits on Unicode whitespace and keeps tokens verbatim.
#[derive(Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn name(&self) -> &'static str {
        "ws"
    }
}

/// Returns the tokenizer registered for `lang`.
pub fn tokenizer_for(lang: &str) -> DvgResult<Arc<dyn Tokenizer>> {
    match lang {
        "en" => Ok(Arc::new(EnglishTokenizer::new()?)),
        "ws" => Ok(Arc::new(WhitespaceTokenizer)),
        other => Err(DvgError::UnknownTokenizer {
            name: other.to_string(),
        }),
    }
}
