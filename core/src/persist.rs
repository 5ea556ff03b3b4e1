use crate::error::{Error, Result};
use crate::index::InvertedIndex;
use crate::search::SearchIndex;
use crate::store::FrozenStore;
use crate::tokenizer::{Analyzer, AnalyzerConfig};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub analyzer: AnalyzerConfig,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_bytes(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Writes a finalized index to `paths.root`. `created_at` is recorded verbatim
/// in `meta.json`.
pub fn save_index(paths: &IndexPaths, index: &SearchIndex, created_at: &str) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bytes(&paths.index(), &bincode::serialize(index.index())?)?;
    write_bytes(&paths.docs(), &bincode::serialize(index.store())?)?;
    let meta = MetaFile {
        num_docs: index.index().num_docs(),
        num_terms: index.index().num_terms(),
        analyzer: index.analyzer().config(),
        created_at: created_at.to_string(),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "snapshot saved");
    Ok(())
}

/// Loads a snapshot written by [`save_index`]; the result is already finalized.
pub fn load_index(paths: &IndexPaths) -> Result<SearchIndex> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        return Err(Error::Snapshot(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            meta.version
        )));
    }
    let index: InvertedIndex = bincode::deserialize(&read_bytes(&paths.index())?)?;
    let store: FrozenStore = bincode::deserialize(&read_bytes(&paths.docs())?)?;
    if !index.is_well_formed() || index.num_docs() as usize != store.len() {
        return Err(Error::Snapshot("index and document store disagree".into()));
    }
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, created_at = %meta.created_at, "snapshot loaded");
    Ok(SearchIndex::from_parts(Analyzer::new(meta.analyzer), index, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;
    use crate::{Document, Field};
    use tempfile::tempdir;

    fn sample() -> SearchIndex {
        let mut builder = IndexBuilder::new(AnalyzerConfig { stem: false, remove_stopwords: true });
        builder
            .add_document(Document { title: "Learning graphs".into(), authors: "Ada Lovelace".into(), ..Default::default() })
            .unwrap();
        builder.finalize()
    }

    #[test]
    fn snapshot_preserves_index_and_analyzer() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &sample(), "2024-01-01T00:00:00Z").unwrap();

        let loaded = load_index(&paths).unwrap();
        assert!(!loaded.analyzer().config().stem);
        assert_eq!(loaded.index().df(Field::Title, "learning"), 1);
        let hits = loaded.query("lovelace", &[Field::Authors], 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.title, "Learning graphs");

        let meta = load_meta(&paths).unwrap();
        assert_eq!(meta.num_docs, 1);
        assert_eq!(meta.created_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &sample(), "now").unwrap();
        let mut meta = load_meta(&paths).unwrap();
        meta.version = 99;
        save_meta(&paths, &meta).unwrap();
        assert!(matches!(load_index(&paths), Err(Error::Snapshot(_))));
    }

    #[test]
    fn missing_snapshot_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(load_index(&IndexPaths::new(dir.path().join("nope"))), Err(Error::Io(_))));
    }
}
