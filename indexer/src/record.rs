use anyhow::{Context, Result};
use paper_core::Document;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One paper as written by the PDF extraction step.
#[derive(Debug, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub publication_date: String,
    pub authors: Vec<AuthorRecord>,
    pub full_text: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorRecord {
    pub full_name: String,
    #[serde(default)]
    pub affiliations: Vec<AffiliationRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AffiliationRecord {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub address: AddressRecord,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressRecord {
    #[serde(default)]
    pub country: String,
}

impl From<PaperRecord> for Document {
    /// Affiliation and address come from the first author's first affiliation only.
    fn from(rec: PaperRecord) -> Self {
        let authors = rec.authors.iter().map(|a| a.full_name.as_str()).collect::<Vec<_>>().join(" ");
        let first = rec.authors.first().and_then(|a| a.affiliations.first());
        Document {
            title: rec.title,
            authors,
            publication_date: rec.publication_date,
            affiliations: first.map(|f| f.organization.clone()).unwrap_or_default(),
            address: first.map(|f| f.address.country.clone()).unwrap_or_default(),
            full_text: rec.full_text,
        }
    }
}

/// Outcome of reading one input file: the records that parsed, and one
/// message per record that did not.
#[derive(Debug, Default)]
pub struct FileRecords {
    pub records: Vec<PaperRecord>,
    pub rejected: Vec<String>,
}

/// Reads a JSON file holding a single paper object or an array of them.
pub fn read_records(path: &Path) -> Result<FileRecords> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {}", path.display()))?;
    let values = match json {
        serde_json::Value::Array(arr) => arr,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => anyhow::bail!("{}: expected a paper object or an array of papers", path.display()),
    };
    let mut out = FileRecords::default();
    for (i, v) in values.into_iter().enumerate() {
        match serde_json::from_value::<PaperRecord>(v) {
            Ok(rec) => out.records.push(rec),
            Err(e) => out.rejected.push(format!("record {i}: {e}")),
        }
    }
    Ok(out)
}
