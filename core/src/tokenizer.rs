use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}][\p{L}\p{M}\p{N}]*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","and","are","as","at","be","but","by","for","if","in","into","is","it",
            "no","not","of","on","or","such","that","the","their","then","there","these",
            "they","this","to","was","will","with",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Reduce terms to their English Snowball stem.
    pub stem: bool,
    pub remove_stopwords: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { stem: true, remove_stopwords: true }
    }
}

/// A normalized term and its position among the raw tokens of the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub position: u32,
}

/// Turns field text into terms. The same analyzer must be used for indexing
/// and for query parsing so both sides produce comparable terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> AnalyzerConfig {
        self.config
    }

    /// NFKC-normalizes and lowercases `text`, then yields its terms lazily.
    pub fn token_stream(&self, text: &str) -> TokenStream {
        TokenStream {
            text: text.nfkc().collect::<String>().to_lowercase(),
            cursor: 0,
            position: 0,
            config: self.config,
        }
    }

    pub fn terms(&self, text: &str) -> Vec<String> {
        self.token_stream(text).map(|t| t.term).collect()
    }
}

/// Lazy term iterator over one piece of text. Cloning a stream restarts
/// iteration from the clone's current point.
#[derive(Debug, Clone)]
pub struct TokenStream {
    text: String,
    cursor: usize,
    position: u32,
    config: AnalyzerConfig,
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let mat = RE.find_at(&self.text, self.cursor)?;
            self.cursor = mat.end();
            let position = self.position;
            self.position += 1;

            let raw = mat.as_str();
            if self.config.remove_stopwords && is_stopword(raw) { continue; }
            let term = if self.config.stem { STEMMER.stem(raw).into_owned() } else { raw.to_string() };
            return Some(Token { term, position });
        }
    }
}

/// Tokenize text into (term, position) with the default analyzer: NFKC normalization,
/// lowercase, stopword removal and stemming.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    Analyzer::default()
        .token_stream(text)
        .map(|t| (t.term, t.position as usize))
        .collect()
}
