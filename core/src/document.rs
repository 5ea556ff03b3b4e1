use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The searchable fields of a paper record, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Authors,
    PublicationDate,
    Affiliations,
    Address,
    FullText,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Title,
        Field::Authors,
        Field::PublicationDate,
        Field::Affiliations,
        Field::Address,
        Field::FullText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Authors => "authors",
            Field::PublicationDate => "publication_date",
            Field::Affiliations => "affiliations",
            Field::Address => "address",
            Field::FullText => "full_text",
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }

    /// Resolves a caller-supplied field list; empty means every field.
    pub fn resolve(fields: &[Field]) -> Vec<Field> {
        if fields.is_empty() {
            return Field::ALL.to_vec();
        }
        let mut out = fields.to_vec();
        out.sort();
        out.dedup();
        out
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// A paper record as admitted by the ingestion side. Every field is present;
/// absent source values arrive as empty strings.
///
/// `affiliations` and `address` describe the first author only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub authors: String,
    pub publication_date: String,
    pub affiliations: String,
    pub address: String,
    pub full_text: String,
}

impl Document {
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Authors => &self.authors,
            Field::PublicationDate => &self.publication_date,
            Field::Affiliations => &self.affiliations,
            Field::Address => &self.address,
            Field::FullText => &self.full_text,
        }
    }

    /// Iterates `(field, text)` pairs in canonical field order.
    pub fn fields(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.iter().map(move |&f| (f, self.field(f)))
    }
}
