use crate::error::{Error, Result};
use crate::search::SearchIndex;
use crate::store::DocumentStore;
use crate::tokenizer::{Analyzer, AnalyzerConfig};
use crate::{Document, Field};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,
    pub positions: Vec<u32>, // ascending token positions within the field
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermPostings {
    /// Number of distinct documents holding the term in this field.
    pub df: u32,
    pub postings: Vec<Posting>, // sorted by doc_id, one entry per document
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FieldIndex {
    pub terms: HashMap<String, TermPostings>,
}

/// Finalized per-field postings plus the corpus statistics used for scoring.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvertedIndex {
    fields: Vec<FieldIndex>, // indexed by Field::slot
    num_docs: u32,
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self { fields: Field::ALL.iter().map(|_| FieldIndex::default()).collect(), num_docs: 0 }
    }
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn num_terms(&self) -> usize {
        self.fields.iter().map(|f| f.terms.len()).sum()
    }

    pub fn term(&self, field: Field, term: &str) -> Option<&TermPostings> {
        self.fields.get(field.slot())?.terms.get(term)
    }

    pub fn postings(&self, field: Field, term: &str) -> &[Posting] {
        self.term(field, term).map(|t| t.postings.as_slice()).unwrap_or(&[])
    }

    pub fn df(&self, field: Field, term: &str) -> u32 {
        self.term(field, term).map_or(0, |t| t.df)
    }

    /// Smoothed inverse document frequency, `ln(1 + N / (1 + df))`. Always
    /// positive and non-increasing in `df`.
    pub fn idf(&self, field: Field, term: &str) -> f32 {
        let n = self.num_docs as f32;
        let df = self.df(field, term) as f32;
        (1.0 + n / (1.0 + df)).ln()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.fields.len() == Field::ALL.len()
    }
}

/// Build-phase index: accumulates postings until `finalize` commits them.
#[derive(Debug)]
pub struct IndexBuilder {
    analyzer: Analyzer,
    store: DocumentStore,
    fields: Vec<HashMap<String, Vec<Posting>>>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl IndexBuilder {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            analyzer: Analyzer::new(config),
            store: DocumentStore::new(),
            fields: Field::ALL.iter().map(|_| HashMap::new()).collect(),
        }
    }

    pub fn analyzer(&self) -> &Analyzer { &self.analyzer }

    pub fn store(&self) -> &DocumentStore { &self.store }

    /// Stores the record and indexes each of its fields.
    pub fn add_document(&mut self, doc: Document) -> Result<DocId> {
        let doc_id = self.store.put(doc.clone());
        for (field, text) in doc.fields() {
            self.index(doc_id, field, text)?;
        }
        Ok(doc_id)
    }

    /// Adds postings for `text` under `field`. Must be called at most once per
    /// `(doc_id, field)` pair.
    pub fn index(&mut self, doc_id: DocId, field: Field, text: &str) -> Result<()> {
        if !self.store.contains(doc_id) {
            return Err(Error::NotFound(doc_id));
        }
        let mut per_term: HashMap<String, Vec<u32>> = HashMap::new();
        for token in self.analyzer.token_stream(text) {
            per_term.entry(token.term).or_default().push(token.position);
        }
        let terms = &mut self.fields[field.slot()];
        for (term, positions) in per_term {
            let term_freq = positions.len() as u32;
            terms.entry(term).or_default().push(Posting { doc_id, term_freq, positions });
        }
        Ok(())
    }

    /// Sorts and merges postings, commits document frequencies and the
    /// document count, and freezes the store.
    pub fn finalize(self) -> SearchIndex {
        let num_docs = self.store.len() as u32;
        let fields = self
            .fields
            .into_iter()
            .map(|terms| FieldIndex {
                terms: terms
                    .into_iter()
                    .map(|(term, postings)| {
                        let postings = merge_postings(postings);
                        (term, TermPostings { df: postings.len() as u32, postings })
                    })
                    .collect(),
            })
            .collect();
        let index = InvertedIndex { fields, num_docs };
        tracing::info!(num_docs, num_terms = index.num_terms(), "index finalized");
        SearchIndex::from_parts(self.analyzer, index, self.store.freeze())
    }
}

fn merge_postings(mut postings: Vec<Posting>) -> Vec<Posting> {
    postings.sort_by_key(|p| p.doc_id);
    postings.dedup_by(|later, earlier| {
        if later.doc_id != earlier.doc_id {
            return false;
        }
        earlier.term_freq += later.term_freq;
        earlier.positions.append(&mut later.positions);
        earlier.positions.sort_unstable();
        true
    });
    postings
}
