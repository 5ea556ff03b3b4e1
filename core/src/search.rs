use crate::error::Result;
use crate::index::{InvertedIndex, Posting};
use crate::query::{self, QueryNode};
use crate::store::FrozenStore;
use crate::tokenizer::Analyzer;
use crate::{DocId, Document, Field};
use serde::Serialize;
use std::collections::HashMap;

type Scores = HashMap<DocId, f32>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
}

/// A ranked result with its stored record attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
    #[serde(flatten)]
    pub document: Document,
}

/// The query-phase index: immutable, shareable across threads.
#[derive(Debug)]
pub struct SearchIndex {
    analyzer: Analyzer,
    index: InvertedIndex,
    store: FrozenStore,
}

impl SearchIndex {
    pub(crate) fn from_parts(analyzer: Analyzer, index: InvertedIndex, store: FrozenStore) -> Self {
        Self { analyzer, index, store }
    }

    pub fn analyzer(&self) -> &Analyzer { &self.analyzer }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn store(&self) -> &FrozenStore { &self.store }

    pub fn get(&self, doc_id: DocId) -> Result<&Document> {
        self.store.get(doc_id)
    }

    /// Parses `query` and returns up to `k` hits with their records.
    pub fn query(&self, query: &str, fields: &[Field], k: usize) -> Result<Vec<SearchHit>> {
        let Some(tree) = query::parse(query, fields, &self.analyzer)? else {
            tracing::debug!(query, "query has no searchable terms");
            return Ok(Vec::new());
        };
        let scored = self.search(&tree, k);
        tracing::debug!(query, leaves = tree.leaf_count(), hits = scored.len(), "query evaluated");
        scored
            .into_iter()
            .map(|s| {
                let document = self.store.get(s.doc_id)?.clone();
                Ok(SearchHit { doc_id: s.doc_id, score: s.score, document })
            })
            .collect()
    }

    /// Evaluates the tree and returns the `k` best documents, highest score
    /// first and ties broken by ascending id.
    pub fn search(&self, tree: &QueryNode, k: usize) -> Vec<ScoredDoc> {
        if k == 0 {
            return Vec::new();
        }
        let mut hits: Vec<ScoredDoc> = self
            .evaluate(tree)
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc_id, score)| ScoredDoc { doc_id, score })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        hits.truncate(k);
        hits
    }

    fn evaluate(&self, node: &QueryNode) -> Scores {
        match node {
            QueryNode::Term { term, fields } => self.term_scores(term, fields),
            QueryNode::Phrase { terms, fields } => self.phrase_scores(terms, fields),
            QueryNode::And(children) => self.combine(children, true),
            QueryNode::Or(children) => self.combine(children, false),
            QueryNode::Required(inner) => self.evaluate(inner),
            // A negation only removes documents from a sibling's matches.
            QueryNode::Not(_) => Scores::new(),
        }
    }

    fn term_scores(&self, term: &str, fields: &[Field]) -> Scores {
        let mut scores = Scores::new();
        for &field in fields {
            let idf = self.index.idf(field, term);
            for p in self.index.postings(field, term) {
                *scores.entry(p.doc_id).or_insert(0.0) += tf_weight(p.term_freq) * idf;
            }
        }
        scores
    }

    fn phrase_scores(&self, terms: &[(String, u32)], fields: &[Field]) -> Scores {
        let mut scores = Scores::new();
        for &field in fields {
            let idf_sum: f32 = terms.iter().map(|(t, _)| self.index.idf(field, t)).sum();
            for (doc_id, freq) in self.phrase_freqs(field, terms) {
                *scores.entry(doc_id).or_insert(0.0) += tf_weight(freq) * idf_sum;
            }
        }
        scores
    }

    /// Walks the sorted postings of every phrase term in lockstep and counts,
    /// for each document holding all of them, how often they line up.
    fn phrase_freqs(&self, field: Field, terms: &[(String, u32)]) -> Vec<(DocId, u32)> {
        if terms.is_empty() {
            return Vec::new();
        }
        let lists: Vec<&[Posting]> = terms.iter().map(|(t, _)| self.index.postings(field, t)).collect();
        let offsets: Vec<u32> = terms.iter().map(|(_, off)| *off).collect();
        let mut cursors = vec![0usize; lists.len()];
        let mut out = Vec::new();

        'outer: loop {
            let mut target = 0;
            for (list, &cur) in lists.iter().zip(&cursors) {
                let Some(p) = list.get(cur) else { break 'outer };
                target = target.max(p.doc_id);
            }
            let mut aligned = true;
            for (list, cur) in lists.iter().zip(cursors.iter_mut()) {
                while list.get(*cur).is_some_and(|p| p.doc_id < target) {
                    *cur += 1;
                }
                match list.get(*cur) {
                    Some(p) if p.doc_id == target => {}
                    Some(_) => aligned = false,
                    None => break 'outer,
                }
            }
            if !aligned {
                continue;
            }
            let postings: Vec<&Posting> = lists.iter().zip(&cursors).map(|(l, &c)| &l[c]).collect();
            let freq = count_phrase(&postings, &offsets);
            if freq > 0 {
                out.push((target, freq));
            }
            for cur in cursors.iter_mut() {
                *cur += 1;
            }
        }
        out
    }

    /// Required clauses (every child of an `And`, `+` children of an `Or`)
    /// are intersected; plain `Or` children are unioned, or only add score
    /// once something is required. Negations remove their matches last.
    fn combine(&self, children: &[QueryNode], intersect: bool) -> Scores {
        let mut required: Vec<&QueryNode> = Vec::new();
        let mut optional: Vec<&QueryNode> = Vec::new();
        let mut negative: Vec<&QueryNode> = Vec::new();
        for child in children {
            match child {
                QueryNode::Not(inner) => negative.push(&**inner),
                QueryNode::Required(inner) => required.push(&**inner),
                other if intersect => required.push(other),
                other => optional.push(other),
            }
        }

        let mut acc = if required.is_empty() {
            self.union(&optional)
        } else {
            let mut acc = self.intersection(&required);
            for node in optional {
                for (doc_id, score) in self.evaluate(node) {
                    if let Some(total) = acc.get_mut(&doc_id) {
                        *total += score;
                    }
                }
            }
            acc
        };
        for node in negative {
            let excluded = self.evaluate(node);
            acc.retain(|doc_id, _| !excluded.contains_key(doc_id));
        }
        acc
    }

    fn intersection(&self, nodes: &[&QueryNode]) -> Scores {
        let mut iter = nodes.iter().map(|node| self.evaluate(node));
        let Some(mut acc) = iter.next() else {
            return Scores::new();
        };
        for next in iter {
            acc.retain(|doc_id, _| next.contains_key(doc_id));
            for (doc_id, score) in acc.iter_mut() {
                *score += next[doc_id];
            }
        }
        acc
    }

    fn union(&self, nodes: &[&QueryNode]) -> Scores {
        let mut acc = Scores::new();
        for node in nodes {
            for (doc_id, score) in self.evaluate(node) {
                *acc.entry(doc_id).or_insert(0.0) += score;
            }
        }
        acc
    }
}

/// Sublinear term-frequency weight, `1 + ln(tf)`.
fn tf_weight(tf: u32) -> f32 {
    if tf == 0 { 0.0 } else { 1.0 + (tf as f32).ln() }
}

fn count_phrase(postings: &[&Posting], offsets: &[u32]) -> u32 {
    let Some((first, rest)) = postings.split_first() else { return 0 };
    first
        .positions
        .iter()
        .filter(|&&start| {
            rest.iter()
                .zip(&offsets[1..])
                .all(|(p, &off)| p.positions.binary_search(&(start + off)).is_ok())
        })
        .count() as u32
}
