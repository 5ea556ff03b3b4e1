use crate::DocId;
use thiserror::Error;

/// Errors surfaced by the retrieval core.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed query string. `position` is a byte offset into the query.
    #[error("query syntax error at {position}: {message} (near {fragment:?})")]
    QuerySyntax {
        message: String,
        position: usize,
        fragment: String,
    },

    #[error("document not found: {0}")]
    NotFound(DocId),

    /// Operation called out of phase order.
    #[error("usage error: {0}")]
    Usage(&'static str),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn syntax(message: impl Into<String>, position: usize, query: &str) -> Self {
        let fragment = query
            .get(position..)
            .unwrap_or("")
            .chars()
            .take(16)
            .collect();
        Error::QuerySyntax { message: message.into(), position, fragment }
    }
}
