//! In-memory retrieval engine for paper records: analysis, inverted index,
//! query parsing and ranked top-k search.

pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use document::{Document, Field};
pub use engine::{Engine, DEFAULT_LIMIT};
pub use error::{Error, Result};
pub use index::{DocId, IndexBuilder, InvertedIndex, Posting};
pub use query::{parse, QueryNode};
pub use search::{ScoredDoc, SearchHit, SearchIndex};
pub use tokenizer::{Analyzer, AnalyzerConfig};
