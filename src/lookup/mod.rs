//! Book metadata lookup.
//!
//! Rentals only need a page count (for pricing) and an author (for display).
//! Lookups never fail: any problem talking to the metadata service yields
//! [`BookMetadata::fallback`].

mod openlibrary;

pub use openlibrary::OpenLibraryClient;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LookupConfig;
use crate::rentals::fees::DEFAULT_PAGE_COUNT;

pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub pages: i64,
    pub author: String,
}

impl BookMetadata {
    pub fn fallback() -> Self {
        Self {
            pages: DEFAULT_PAGE_COUNT,
            author: UNKNOWN_AUTHOR.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.pages == DEFAULT_PAGE_COUNT && self.author == UNKNOWN_AUTHOR
    }
}

#[async_trait]
pub trait BookLookup: Send + Sync {
    /// Look up metadata for a free-text title. Never fails.
    async fn fetch(&self, title: &str) -> BookMetadata;
}

/// Lookup used when the metadata service is disabled
pub struct OfflineLookup;

#[async_trait]
impl BookLookup for OfflineLookup {
    async fn fetch(&self, _title: &str) -> BookMetadata {
        BookMetadata::fallback()
    }
}

/// Build the lookup selected by configuration
pub fn from_config(config: &LookupConfig) -> Result<Arc<dyn BookLookup>> {
    if !config.enabled {
        tracing::info!("Book metadata lookup disabled, using fallback metadata");
        return Ok(Arc::new(OfflineLookup));
    }

    Ok(Arc::new(OpenLibraryClient::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_values() {
        let fallback = BookMetadata::fallback();
        assert_eq!(fallback.pages, 100);
        assert_eq!(fallback.author, "Unknown");
        assert!(fallback.is_fallback());

        let partial = BookMetadata {
            pages: 100,
            author: "Ursula K. Le Guin".to_string(),
        };
        assert!(!partial.is_fallback());
    }

    #[tokio::test]
    async fn test_offline_lookup_always_falls_back() {
        let lookup = from_config(&LookupConfig {
            enabled: false,
            ..LookupConfig::default()
        })
        .unwrap();

        assert_eq!(lookup.fetch("Dune").await, BookMetadata::fallback());
    }
}
