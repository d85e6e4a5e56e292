//! Value types for the crawl graph
//!
//! A cache entry is one of three things: a fetched [`Resource`], a
//! placeholder [`Link`] for a discovered but unvisited document, or a
//! finalized [`Chapter`]. All three are pure data; the cache owns every
//! instance for the duration of a crawl run.

pub mod chapter;
pub mod link;
pub mod resource;
pub mod stats;

pub use chapter::Chapter;
pub use link::Link;
pub use resource::Resource;
pub use stats::PageStats;

/// One entry in the shared resource cache, keyed by canonical URL
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Resource(Resource),
    Link(Link),
    Chapter(Chapter),
}

impl CacheEntry {
    /// The canonical URL this entry is keyed by
    pub fn url(&self) -> &str {
        match self {
            Self::Resource(r) => &r.url,
            Self::Link(l) => &l.url,
            Self::Chapter(c) => &c.url,
        }
    }

    /// Whether this entry is part of the final output
    pub fn save(&self) -> bool {
        match self {
            Self::Resource(r) => r.save,
            Self::Link(l) => l.save,
            Self::Chapter(c) => c.save,
        }
    }

    pub fn set_save(&mut self, save: bool) {
        match self {
            Self::Resource(r) => r.save = save,
            Self::Link(l) => l.save = save,
            Self::Chapter(c) => c.save = save,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::Resource(r) => &r.mime_type,
            Self::Link(l) => &l.mime_type,
            Self::Chapter(c) => &c.mime_type,
        }
    }

    /// Output path of this entry inside the assembled book
    pub fn book_path(&self) -> String {
        match self {
            Self::Resource(r) => r.book_path(),
            Self::Link(l) => l.book_path(),
            Self::Chapter(c) => c.book_path(),
        }
    }

    /// Records that `from` was seen linking to this entry
    pub fn add_backlink(&mut self, from: &str) {
        let list = match self {
            Self::Resource(r) => &mut r.backlinks,
            Self::Link(l) => &mut l.from,
            Self::Chapter(c) => &mut c.backlinks,
        };
        if !list.iter().any(|u| u == from) {
            list.push(from.to_string());
        }
    }

    pub fn backlinks(&self) -> &[String] {
        match self {
            Self::Resource(r) => &r.backlinks,
            Self::Link(l) => &l.from,
            Self::Chapter(c) => &c.backlinks,
        }
    }

    /// Buffered bytes, if this entry carries any
    ///
    /// Links never carry content; chapters expose their serialized document.
    pub fn content_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Resource(r) => r.content.as_deref(),
            Self::Link(_) => None,
            Self::Chapter(c) => Some(c.content.as_bytes()),
        }
    }

    pub fn is_chapter(&self) -> bool {
        matches!(self, Self::Chapter(_))
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(_))
    }
}
