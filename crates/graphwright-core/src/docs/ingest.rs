//! Breadth-first documentation crawler.

use super::{save_documents, Document, DocsError};
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

/// Documentation crawled when no URL is configured.
pub const DEFAULT_DOCS_URL: &str = "https://python.langchain.com/docs/langgraph/";

/// Default link depth followed from the root page.
pub const DEFAULT_MAX_DEPTH: usize = 20;

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, pre, p";

/// Crawls pages under a root URL and converts them to markdown documents.
#[derive(Debug, Clone)]
pub struct DocsIngestor {
    client: reqwest::Client,
    root: Url,
    max_depth: usize,
}

impl DocsIngestor {
    /// Creates a crawler rooted at `url`.
    ///
    /// # Errors
    /// Returns `DocsError::InvalidUrl` if `url` does not parse.
    pub fn new(url: &str, max_depth: usize) -> Result<Self, DocsError> {
        let root = Url::parse(url)
            .map_err(|e| DocsError::InvalidUrl { url: url.to_string(), reason: e.to_string() })?;
        Ok(Self { client: reqwest::Client::new(), root, max_depth })
    }

    /// Root URL of the crawl.
    #[must_use]
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Crawls every page reachable from the root without leaving it.
    ///
    /// Documents are ordered by source URL, descending. Pages other than the
    /// root that fail to load are skipped with a warning.
    ///
    /// # Errors
    /// Returns a `DocsError` if the root page cannot be fetched.
    pub async fn crawl(&self) -> Result<Vec<Document>, DocsError> {
        let mut queue = VecDeque::from([(self.root.clone(), 0_usize)]);
        let mut seen = HashSet::from([self.root.to_string()]);
        let mut documents = Vec::new();

        while let Some((url, depth)) = queue.pop_front() {
            let html = match self.fetch(&url).await {
                Ok(html) => html,
                Err(e) if depth == 0 => return Err(e),
                Err(e) => {
                    warn!(url = %url, error = %e, "Skipping page");
                    continue;
                }
            };

            if depth < self.max_depth {
                for link in extract_links(&html, &url) {
                    if link.as_str().starts_with(self.root.as_str()) && seen.insert(link.to_string()) {
                        queue.push_back((link, depth + 1));
                    }
                }
            }

            debug!(url = %url, depth, "Converted page");
            documents.push(Document { source: url.to_string(), content: html_to_markdown(&html) });
        }

        documents.sort_by(|a, b| b.source.cmp(&a.source));
        info!(root = %self.root, documents = documents.len(), "Crawl finished");
        Ok(documents)
    }

    /// Crawls and persists the documents to `path`.
    ///
    /// # Errors
    /// Returns a `DocsError` if the crawl or the write fails.
    pub async fn ingest(&self, path: &Path) -> Result<Vec<Document>, DocsError> {
        let documents = self.crawl().await?;
        save_documents(path, &documents).await?;
        info!(path = %path.display(), documents = documents.len(), "Saved reference documents");
        Ok(documents)
    }

    async fn fetch(&self, url: &Url) -> Result<String, DocsError> {
        let fetch_err = |source| DocsError::Fetch { url: url.to_string(), source };

        let response = self.client.get(url.clone()).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocsError::Status { url: url.to_string(), status: status.as_u16() });
        }
        response.text().await.map_err(fetch_err)
    }
}

/// Converts the headings, code blocks and paragraphs of an HTML page to
/// markdown, in document order.
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    let Some(blocks) = Selector::parse(BLOCK_SELECTOR).ok() else {
        return String::new();
    };
    let code = Selector::parse("code").ok();
    let document = Html::parse_document(html);

    let mut parts = Vec::new();
    for element in document.select(&blocks) {
        let name = element.value().name();
        let block = match name {
            "pre" => {
                let source = code
                    .as_ref()
                    .and_then(|sel| element.select(sel).next())
                    .unwrap_or(element);
                let text: String = source.text().collect();
                format!("```\n{}\n```", text.trim_matches('\n'))
            }
            "p" => collapsed_text(element),
            heading => {
                let level = heading[1..].parse::<usize>().unwrap_or(1);
                let text = collapsed_text(element);
                if text.is_empty() {
                    String::new()
                } else {
                    format!("{} {}", "#".repeat(level), text)
                }
            }
        };

        if !block.is_empty() {
            parts.push(block);
        }
    }

    parts.join("\n\n")
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Returns the absolute targets of every link on the page, without fragments.
fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let Some(anchors) = Selector::parse("a[href]").ok() else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}
