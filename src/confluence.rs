//! Confluence content aggregation.
//!
//! Lists every page of a space through the paginated content endpoint,
//! normalizes each storage-format body to text and concatenates the pages
//! into a single document:
//!
//! ```text
//!
//!
//! ## <title>
//! <text>
//! ```
//!
//! Blocks are joined with `"\n"` in the order the endpoint returns them.
//!
//! # Environment Variables
//!
//! - `CONFLUENCE_EMAIL`: required, account email for basic auth
//! - `CONFLUENCE_API_TOKEN`: required, API token for basic auth
//!
//! # Pagination
//!
//! `GET {base_url}/rest/api/content?type=page&spaceKey=..&limit=..&start=..&expand=body.storage`
//! is called with an increasing `start` until a page comes back empty or
//! shorter than `limit`. Any failed call aborts the whole aggregation; no
//! partial document is returned and nothing is retried.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::error::{truncate_body, FetchError};
use crate::html::html_to_text;
use crate::models::{ContentListing, PageRecord};
use crate::progress::{FetchProgressEvent, FetchProgressReporter, ProgressMode};

// ============ Credentials ============

/// Basic-auth credentials loaded from environment variables.
#[derive(Clone)]
pub struct ConfluenceCredentials {
    pub email: String,
    pub api_token: String,
}

impl ConfluenceCredentials {
    pub fn new(email: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            api_token: api_token.into(),
        }
    }

    /// Load credentials from `CONFLUENCE_EMAIL` and `CONFLUENCE_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let email = std::env::var("CONFLUENCE_EMAIL")
            .context("CONFLUENCE_EMAIL environment variable not set")?;
        let api_token = std::env::var("CONFLUENCE_API_TOKEN")
            .context("CONFLUENCE_API_TOKEN environment variable not set")?;
        Ok(Self { email, api_token })
    }
}

impl std::fmt::Debug for ConfluenceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceCredentials")
            .field("email", &self.email)
            .field("api_token", &"***")
            .finish()
    }
}

// ============ Listing seam ============

/// One listing round trip: the records of a space starting at `start`.
#[async_trait]
pub trait PageLister: Send + Sync {
    async fn list_pages(
        &self,
        space_key: &str,
        start: usize,
        limit: usize,
    ) -> Result<Vec<PageRecord>, FetchError>;
}

/// Format one page as a document block: blank lines, `## title`, then text.
pub fn page_block(page: &PageRecord) -> String {
    format!("\n\n## {}\n{}", page.title(), html_to_text(page.markup()))
}

/// Walk every listing page of `space_key` and assemble the document.
///
/// Stops on an empty page or one shorter than `limit`; otherwise advances
/// `start` by `limit`. The first error aborts and is returned as is.
pub async fn aggregate_space(
    lister: &dyn PageLister,
    space_key: &str,
    limit: usize,
    progress: &dyn FetchProgressReporter,
) -> Result<String, FetchError> {
    let limit = limit.max(1);
    let mut blocks: Vec<String> = Vec::new();
    let mut start = 0;

    loop {
        progress.report(FetchProgressEvent::Listing {
            space: space_key.to_string(),
            start,
        });

        let pages = lister.list_pages(space_key, start, limit).await?;
        tracing::debug!(space = space_key, start, returned = pages.len(), "listing page received");

        if pages.is_empty() {
            break;
        }

        let returned = pages.len();
        blocks.extend(pages.iter().map(page_block));

        if returned < limit {
            break;
        }
        start += limit;
    }

    progress.report(FetchProgressEvent::Done {
        space: space_key.to_string(),
        pages: blocks.len(),
    });
    tracing::info!(space = space_key, pages = blocks.len(), "space aggregated");

    Ok(blocks.join("\n"))
}

// ============ HTTP client ============

/// REST client for one Confluence site.
pub struct ConfluenceClient {
    client: reqwest::Client,
    base_url: String,
    credentials: ConfluenceCredentials,
    page_limit: usize,
}

impl ConfluenceClient {
    /// `base_url` is the wiki root, e.g. `https://acme.atlassian.net/wiki`.
    pub fn new(base_url: &str, credentials: ConfluenceCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            page_limit: 50,
        }
    }

    /// Build a client from config and `CONFLUENCE_*` credentials.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = ConfluenceCredentials::from_env()?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.confluence.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url().to_string(),
            credentials,
            page_limit: config.confluence.page_limit,
        })
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    /// Aggregate every page of `space_key` into one document.
    pub async fn fetch_all_pages(
        &self,
        space_key: &str,
        progress: &dyn FetchProgressReporter,
    ) -> Result<String, FetchError> {
        aggregate_space(self, space_key, self.page_limit, progress).await
    }

    /// Fetch a single page by id, formatted like one aggregated block.
    pub async fn fetch_page(&self, page_id: &str) -> Result<String, FetchError> {
        let url = format!("{}/rest/api/content/{}", self.base_url, page_id);
        tracing::debug!(page_id, "fetching single page");

        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
            .header(ACCEPT, "application/json")
            .query(&[("expand", "body.storage")])
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        let page: PageRecord = read_json(&url, resp).await?;
        Ok(page_block(&page))
    }
}

#[async_trait]
impl PageLister for ConfluenceClient {
    async fn list_pages(
        &self,
        space_key: &str,
        start: usize,
        limit: usize,
    ) -> Result<Vec<PageRecord>, FetchError> {
        let url = format!("{}/rest/api/content", self.base_url);
        let limit = limit.to_string();
        let start = start.to_string();

        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
            .header(ACCEPT, "application/json")
            .query(&[
                ("type", "page"),
                ("spaceKey", space_key),
                ("limit", limit.as_str()),
                ("start", start.as_str()),
                ("expand", "body.storage"),
            ])
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        let listing: ContentListing = read_json(&url, resp).await?;
        Ok(listing.results)
    }
}

async fn read_json<T: DeserializeOwned>(url: &str, resp: reqwest::Response) -> Result<T, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(url, status = status.as_u16(), "confluence request failed");
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    let text = resp.text().await.map_err(|source| FetchError::Network {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

// ============ Command entry points ============

/// Build the session document: one page when `page_id` is given, otherwise
/// the whole configured space.
pub async fn load_document(
    config: &Config,
    page_id: Option<&str>,
    progress: ProgressMode,
) -> Result<String> {
    if config.confluence.base_url.trim().is_empty() {
        anyhow::bail!("confluence.base_url is not set (config file or CONFLUENCE_BASE_URL)");
    }

    let client = ConfluenceClient::from_config(config)?;

    match page_id {
        Some(id) => client
            .fetch_page(id)
            .await
            .with_context(|| format!("Failed to fetch page {}", id)),
        None => {
            crate::config::require_space(config)?;
            let space = &config.confluence.space_key;
            let reporter = progress.reporter();
            client
                .fetch_all_pages(space, reporter.as_ref())
                .await
                .with_context(|| format!("Failed to fetch pages of space {}", space))
        }
    }
}

/// `cqa fetch`: print the aggregated document, a preview of it, or write it
/// to a file.
pub async fn run_fetch(
    config: &Config,
    page_id: Option<&str>,
    output: Option<&Path>,
    preview: Option<usize>,
    progress: ProgressMode,
) -> Result<()> {
    let document = load_document(config, page_id, progress).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write document: {}", path.display()))?;
            println!("Wrote {} bytes to {}", document.len(), path.display());
        }
        None => match preview {
            Some(n) => {
                let snippet: String = document.chars().take(n).collect();
                println!("{}\n---", snippet);
            }
            None => println!("{}", document),
        },
    }

    Ok(())
}
