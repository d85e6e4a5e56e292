use crate::url::{filename_for_url, mime_for_url};

/// A placeholder for a discovered but not-yet-crawled document
///
/// Links record discovery only: which pages pointed at the target and at
/// what depth it was first seen. They never carry content and are superseded
/// once the crawl visits the URL and stores a real chapter.
#[derive(Debug, Clone)]
pub struct Link {
    pub url: String,
    /// Pages this target was discovered from
    pub from: Vec<String>,
    /// Discovery depth: parent page depth + 1
    pub depth: u32,
    pub id: String,
    /// Filename the eventual chapter will occupy
    pub filename: String,
    pub mime_type: String,
    /// Always false; placeholders are never exported
    pub save: bool,
}

impl Link {
    pub fn new(url: &str, discovered_from: &str, depth: u32) -> Self {
        Self {
            url: url.to_string(),
            from: vec![discovered_from.to_string()],
            depth,
            id: filename_for_url(url, ""),
            filename: filename_for_url(url, ".xhtml"),
            mime_type: mime_for_url(url),
            save: false,
        }
    }

    pub fn book_path(&self) -> String {
        format!("./chapters/{}", self.filename)
    }
}
