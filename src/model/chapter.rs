use crate::model::PageStats;
use crate::url::safe_filename;
use std::collections::BTreeMap;

/// A fully crawled and formatted document ready for export
///
/// Exactly one chapter exists per canonical URL in the cache; the crawl
/// driver is responsible for not re-visiting a URL (a re-visit silently
/// replaces the earlier chapter).
#[derive(Debug, Clone)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub stats: PageStats,
    pub tags: Vec<String>,
    /// Depth at which the crawl reached this page
    pub depth: u32,
    /// Canonical source URL
    pub url: String,
    /// Serialized final DOM
    pub content: String,
    /// Forward links: canonical target URL to link title
    pub links: BTreeMap<String, String>,
    /// Pages observed linking here
    pub backlinks: Vec<String>,
    pub filename: String,
    pub mime_type: String,
    /// Always true; chapters are the crawl's output
    pub save: bool,
}

impl Chapter {
    /// Builds a chapter from its assembled parts
    ///
    /// The id and filename derive from the page name via the
    /// filesystem-safe transform.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        url: &str,
        depth: u32,
        stats: PageStats,
        tags: Vec<String>,
        content: String,
        links: BTreeMap<String, String>,
        backlinks: Vec<String>,
    ) -> Self {
        let id = safe_filename(&stats.page_name, "");
        let filename = safe_filename(&stats.page_name, "xhtml");
        Self {
            id,
            title: stats.display_title(),
            author: stats.author.clone(),
            stats,
            tags,
            depth,
            url: url.to_string(),
            content,
            links,
            backlinks,
            filename,
            mime_type: "application/xhtml+xml".to_string(),
            save: true,
        }
    }

    pub fn book_path(&self) -> String {
        format!("./chapters/{}", self.filename)
    }
}
