use crate::error::{Error, Result};
use crate::{DocId, Document};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Append-only record store used while the index is being built.
///
/// `put` may be called from several threads at once; ids come from an atomic
/// counter and never collide.
#[derive(Debug, Default)]
pub struct DocumentStore {
    next_id: AtomicU32,
    docs: RwLock<HashMap<DocId, Document>>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    pub fn put(&self, doc: Document) -> DocId {
        let doc_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.docs.write().insert(doc_id, doc);
        doc_id
    }

    pub fn get(&self, doc_id: DocId) -> Result<Document> {
        self.docs.read().get(&doc_id).cloned().ok_or(Error::NotFound(doc_id))
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.docs.read().contains_key(&doc_id)
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ends the build phase for the store.
    pub fn freeze(self) -> FrozenStore {
        FrozenStore { docs: self.docs.into_inner() }
    }
}

/// Read-only store for the query phase; lookups take no lock.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FrozenStore {
    docs: HashMap<DocId, Document>,
}

impl FrozenStore {
    pub fn get(&self, doc_id: DocId) -> Result<&Document> {
        self.docs.get(&doc_id).ok_or(Error::NotFound(doc_id))
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.docs.contains_key(&doc_id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
