use crate::error::{Error, Result};
use crate::index::IndexBuilder;
use crate::search::{SearchHit, SearchIndex};
use crate::tokenizer::AnalyzerConfig;
use crate::{DocId, Document, Field};
use parking_lot::RwLock;
use std::sync::Arc;

/// Result count used when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 10;

enum Phase {
    Building(IndexBuilder),
    Finalized(Arc<SearchIndex>),
}

/// Owned search engine shared by the ingestion and query sides.
///
/// Starts in the building phase; `finalize` moves it, once and for good, to
/// the query phase. Searches clone an `Arc` to the finalized index under a
/// short read lock and then run without any locking.
pub struct Engine {
    phase: RwLock<Phase>,
}

impl Engine {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { phase: RwLock::new(Phase::Building(IndexBuilder::new(config))) }
    }

    /// Wraps an already finalized index, e.g. one loaded from a snapshot.
    pub fn from_index(index: SearchIndex) -> Self {
        Self { phase: RwLock::new(Phase::Finalized(Arc::new(index))) }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(*self.phase.read(), Phase::Finalized(_))
    }

    pub fn add_document(&self, doc: Document) -> Result<DocId> {
        match &mut *self.phase.write() {
            Phase::Building(builder) => builder.add_document(doc),
            Phase::Finalized(_) => Err(Error::Usage("add_document called after finalize")),
        }
    }

    pub fn finalize(&self) -> Result<()> {
        let mut phase = self.phase.write();
        let Phase::Building(builder) = &mut *phase else {
            return Err(Error::Usage("finalize called twice"));
        };
        let index = std::mem::take(builder).finalize();
        *phase = Phase::Finalized(Arc::new(index));
        Ok(())
    }

    /// Handle to the finalized index.
    pub fn index(&self) -> Result<Arc<SearchIndex>> {
        match &*self.phase.read() {
            Phase::Finalized(index) => Ok(Arc::clone(index)),
            Phase::Building(_) => Err(Error::Usage("index is still being built")),
        }
    }

    /// Runs a ranked query. An empty `fields` slice searches every field.
    pub fn search(&self, query: &str, fields: &[Field], k: usize) -> Result<Vec<SearchHit>> {
        let index = self
            .index()
            .map_err(|_| Error::Usage("search called before finalize"))?;
        index.query(query, fields, k)
    }

    pub fn get(&self, doc_id: DocId) -> Result<Document> {
        match &*self.phase.read() {
            Phase::Building(builder) => builder.store().get(doc_id),
            Phase::Finalized(index) => index.get(doc_id).cloned(),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn titled(title: &str) -> Document {
        Document { title: title.into(), ..Default::default() }
    }

    #[test]
    fn phases_are_enforced() {
        let engine = Engine::default();
        engine.add_document(titled("graph")).unwrap();
        assert!(matches!(engine.search("graph", &[], 10), Err(Error::Usage(_))));

        engine.finalize().unwrap();
        assert!(engine.is_finalized());
        assert!(matches!(engine.add_document(titled("tree")), Err(Error::Usage(_))));
        assert!(matches!(engine.finalize(), Err(Error::Usage(_))));
        assert_eq!(engine.search("graph", &[], 10).unwrap().len(), 1);
    }

    #[test]
    fn get_works_in_both_phases() {
        let engine = Engine::default();
        let id = engine.add_document(titled("graph")).unwrap();
        assert_eq!(engine.get(id).unwrap().title, "graph");
        assert!(matches!(engine.get(id + 1), Err(Error::NotFound(_))));
        engine.finalize().unwrap();
        assert_eq!(engine.get(id).unwrap().title, "graph");
    }

    #[test]
    fn concurrent_searches_agree() {
        let engine = Arc::new(Engine::default());
        for i in 0..50 {
            engine.add_document(titled(&format!("graph node{i}"))).unwrap();
        }
        engine.finalize().unwrap();
        let expected = engine.search("graph", &[], 5).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.search("graph", &[], 5).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }
}
