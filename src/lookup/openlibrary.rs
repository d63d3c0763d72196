//! Open Library client.
//!
//! Searches by title, takes the author of the first hit, then reads the page
//! count from that hit's first edition.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{BookLookup, BookMetadata, UNKNOWN_AUTHOR};
use crate::config::LookupConfig;
use crate::rentals::fees::DEFAULT_PAGE_COUNT;

pub struct OpenLibraryClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    author_name: Option<Vec<String>>,
    #[serde(default)]
    edition_key: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Edition {
    #[serde(default)]
    number_of_pages: Option<serde_json::Value>,
}

impl Edition {
    /// Page count if present and positive; Open Library sometimes stores it as a string
    fn pages(&self) -> Option<i64> {
        let pages = match self.number_of_pages.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64()?,
            serde_json::Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        (pages > 0).then_some(pages)
    }
}

impl OpenLibraryClient {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create Open Library HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to reach Open Library")?;

        if !response.status().is_success() {
            anyhow::bail!("Open Library returned {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse Open Library response")
    }

    async fn try_fetch(&self, title: &str) -> Result<BookMetadata> {
        let search: SearchResponse = self
            .get(&format!("{}/search.json", self.base_url), &[("title", title.trim())])
            .await?;

        let Some(doc) = search.docs.into_iter().next() else {
            return Ok(BookMetadata::fallback());
        };

        let author = doc
            .author_name
            .and_then(|names| names.into_iter().next())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        let Some(edition_key) = doc.edition_key.into_iter().next() else {
            return Ok(BookMetadata {
                pages: DEFAULT_PAGE_COUNT,
                author,
            });
        };

        if !edition_key.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!("Unexpected edition key: {}", edition_key);
        }

        let edition: Edition = self
            .get(&format!("{}/books/{}.json", self.base_url, edition_key), &[])
            .await?;

        Ok(BookMetadata {
            pages: edition.pages().unwrap_or(DEFAULT_PAGE_COUNT),
            author,
        })
    }
}

#[async_trait]
impl BookLookup for OpenLibraryClient {
    async fn fetch(&self, title: &str) -> BookMetadata {
        match self.try_fetch(title).await {
            Ok(metadata) => {
                tracing::debug!(
                    title = %title,
                    pages = metadata.pages,
                    author = %metadata.author,
                    "Fetched book metadata"
                );
                metadata
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    title = %title,
                    "Book metadata lookup failed, using fallback"
                );
                BookMetadata::fallback()
            }
        }
    }
}
