//! Reference documentation injected into every code-generation prompt.
//!
//! The corpus is crawled once by [`DocsIngestor`], persisted as a JSON array
//! of documents, and loaded lazily by [`DocsCache`]. A cache is constructed by
//! the caller and shared with every workflow node that needs reference text;
//! the first reader loads (or rebuilds) it and later readers reuse the text.

pub mod ingest;

pub use ingest::{html_to_markdown, DocsIngestor, DEFAULT_DOCS_URL, DEFAULT_MAX_DEPTH};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Separator placed between documents in the prompt corpus.
pub const DOC_SEPARATOR: &str = "\n\n\n --- \n\n\n";

/// A crawled page converted to markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// URL the page was fetched from.
    pub source: String,
    /// Markdown content.
    pub content: String,
}

/// Errors raised while building or loading the documentation corpus.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Reading or writing the cache file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not a valid document list.
    #[error("Invalid docs cache {path}: {source}")]
    Corrupt {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The cache file does not exist and the cache cannot rebuild it.
    #[error("Docs cache {0} not found; run `graphwright ingest` first")]
    Missing(PathBuf),

    /// The crawl root is not a valid URL.
    #[error("Invalid docs URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parse failure.
        reason: String,
    },

    /// Fetching a page failed.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        /// Page URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered the crawl root with a failure status.
    #[error("Fetching {url} returned HTTP {status}")]
    Status {
        /// Page URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
}

/// Joins document contents into the prompt corpus.
#[must_use]
pub fn format_docs(docs: &[Document]) -> String {
    docs.iter().map(|doc| doc.content.as_str()).collect::<Vec<_>>().join(DOC_SEPARATOR)
}

/// Reads a persisted document list.
///
/// # Errors
/// Returns `DocsError::Io` or `DocsError::Corrupt`.
pub async fn load_documents(path: &Path) -> Result<Vec<Document>, DocsError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DocsError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw).map_err(|source| DocsError::Corrupt { path: path.to_path_buf(), source })
}

/// Persists a document list, creating parent directories as needed.
///
/// # Errors
/// Returns `DocsError::Io` if the file cannot be written.
pub async fn save_documents(path: &Path, docs: &[Document]) -> Result<(), DocsError> {
    let io_err = |source| DocsError::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
    }

    let json = serde_json::to_string(docs)
        .map_err(|source| DocsError::Corrupt { path: path.to_path_buf(), source })?;
    tokio::fs::write(path, json).await.map_err(io_err)
}

/// Initialize-once handle on the documentation corpus.
#[derive(Debug)]
pub struct DocsCache {
    path: PathBuf,
    ingestor: Option<DocsIngestor>,
    text: OnceCell<String>,
}

impl DocsCache {
    /// Creates a cache backed by `path` that crawls with `ingestor` when the
    /// file is missing.
    #[must_use]
    pub fn new(path: PathBuf, ingestor: DocsIngestor) -> Self {
        Self { path, ingestor: Some(ingestor), text: OnceCell::new() }
    }

    /// Creates a cache that only reads `path` and never crawls.
    #[must_use]
    pub fn offline(path: PathBuf) -> Self {
        Self { path, ingestor: None, text: OnceCell::new() }
    }

    /// Creates a cache already holding `text`.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { path: PathBuf::new(), ingestor: None, text: OnceCell::new_with(Some(text.into())) }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once the corpus has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.text.initialized()
    }

    /// Returns the corpus text, loading or rebuilding it on first use.
    ///
    /// # Errors
    /// Returns a `DocsError` if the file cannot be read, or is missing and
    /// cannot be rebuilt.
    pub async fn text(&self) -> Result<&str, DocsError> {
        let text = self.text.get_or_try_init(|| self.load()).await?;
        Ok(text.as_str())
    }

    async fn load(&self) -> Result<String, DocsError> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| DocsError::Io { path: self.path.clone(), source })?;

        if !exists {
            let Some(ref ingestor) = self.ingestor else {
                return Err(DocsError::Missing(self.path.clone()));
            };
            warn!(path = %self.path.display(), "No documents found. Ingesting documents...");
            let docs = ingestor.ingest(&self.path).await?;
            return Ok(format_docs(&docs));
        }

        let docs = load_documents(&self.path).await?;
        info!(path = %self.path.display(), documents = docs.len(), "Loaded reference documents");
        Ok(format_docs(&docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_docs() -> Vec<Document> {
        vec![
            Document { source: "https://docs/b".to_string(), content: "# B".to_string() },
            Document { source: "https://docs/a".to_string(), content: "# A".to_string() },
        ]
    }

    #[test]
    fn test_format_docs_separator() {
        assert_eq!(format_docs(&sample_docs()), "# B\n\n\n --- \n\n\n# A");
        assert_eq!(format_docs(&[]), "");
    }

    #[tokio::test]
    async fn test_save_then_load_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("docs.json");
        save_documents(&path, &sample_docs()).await.unwrap();

        let cache = DocsCache::offline(path);
        assert!(!cache.is_loaded());
        assert_eq!(cache.text().await.unwrap(), "# B\n\n\n --- \n\n\n# A");
        assert!(cache.is_loaded());
    }

    #[tokio::test]
    async fn test_cache_reuses_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");
        save_documents(&path, &sample_docs()).await.unwrap();

        let cache = DocsCache::offline(path.clone());
        let first = cache.text().await.unwrap().to_string();

        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(cache.text().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_offline_cache_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocsCache::offline(dir.path().join("absent.json"));
        assert!(matches!(cache.text().await, Err(DocsError::Missing(_))));
    }

    #[tokio::test]
    async fn test_corrupt_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let cache = DocsCache::offline(path);
        assert!(matches!(cache.text().await, Err(DocsError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_preloaded_text() {
        let cache = DocsCache::from_text("reference");
        assert!(cache.is_loaded());
        assert_eq!(cache.text().await.unwrap(), "reference");
    }
}
