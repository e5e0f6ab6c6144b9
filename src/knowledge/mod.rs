//! Knowledge search
//!
//! A static document set, loaded once at startup, that callers may query to
//! build the `context` they send with a question.

pub mod search;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// One searchable record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A ranked document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: Document,
    pub score: usize,
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse knowledge file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable document set
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<Document>,
}

impl KnowledgeBase {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a JSON array of documents
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let documents: Vec<Document> =
            serde_json::from_str(&raw).map_err(|source| KnowledgeError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), documents = documents.len(), "Knowledge base loaded");
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Up to [`search::MAX_RESULTS`] documents ranked for `query`
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search::rank(&self.documents, query)
    }
}
