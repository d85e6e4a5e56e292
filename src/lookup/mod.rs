//! Metadata/statistics lookup interface
//!
//! Page statistics (title, author, rating, tags) come from an external
//! lookup service keyed by wiki page name; this crate only consumes the
//! contract.

use crate::model::PageStats;
use async_trait::async_trait;

/// External page-metadata service
#[async_trait]
pub trait WikiLookup: Send + Sync {
    /// Fetches statistics for a page by its unix name (and numeric id,
    /// when the page reported one)
    async fn get_stats(&self, page_name: &str, page_id: Option<u64>)
        -> anyhow::Result<PageStats>;

    /// Whether a tag set classifies the page as meta content
    ///
    /// Drives the crawl policy's skip decision at or beyond the configured
    /// depth threshold.
    fn has_meta_tag(&self, tags: &[String]) -> bool;
}
