use crate::url::{filename_for_url, is_data_url, is_media_mime};

/// A network asset captured during a page load
///
/// Created from an intercepted response and stored in the cache keyed by
/// canonical URL. Content is set at most once; once cached, a resource only
/// changes through `save` flips and backlink accumulation.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Canonical URL of the asset
    pub url: String,
    /// MIME type reported by the response (or inferred from the URL)
    pub mime_type: String,
    /// Buffered body, present only for eagerly-downloaded assets
    pub content: Option<Vec<u8>>,
    /// Whether this asset is retained in the final output
    pub save: bool,
    /// Output filename inside the book
    pub filename: String,
    /// Whether the response was served from the rendering engine's cache
    pub from_cache: bool,
    /// Pages observed linking to this asset
    pub backlinks: Vec<String>,
}

impl Resource {
    pub fn new(url: &str, mime_type: &str) -> Self {
        Self {
            url: url.to_string(),
            mime_type: mime_type.to_string(),
            content: None,
            save: false,
            filename: filename_for_url(url, ""),
            from_cache: false,
            backlinks: Vec::new(),
        }
    }

    /// Builds a resource from a completed network response
    pub fn from_response(url: &str, mime_type: &str, from_cache: bool) -> Self {
        let mut resource = Self::new(url, mime_type);
        resource.from_cache = from_cache;
        resource
    }

    /// True for image assets, which are eagerly buffered on response
    pub fn is_image(&self) -> bool {
        is_media_mime(&self.mime_type) && self.mime_type.starts_with("image/")
    }

    /// True for `data:` URLs carrying their payload inline
    pub fn is_data_url(&self) -> bool {
        is_data_url(&self.url)
    }

    /// Output path of this asset inside the assembled book
    ///
    /// Stable for the lifetime of the resource; repeated persist requests
    /// for the same URL always resolve to the same path.
    pub fn book_path(&self) -> String {
        format!("./resources/{}", self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_starts_unsaved_and_empty() {
        let resource = Resource::from_response("https://example.com/a.png", "image/png", false);
        assert!(!resource.save);
        assert!(resource.content.is_none());
        assert!(resource.is_image());
    }

    #[test]
    fn test_data_url_classification() {
        let resource = Resource::new("data:image/gif;base64,R0lG", "image/gif");
        assert!(resource.is_data_url());
    }

    #[test]
    fn test_book_path_is_stable() {
        let resource = Resource::new("https://example.com/img/a.png", "image/png");
        assert_eq!(resource.book_path(), resource.book_path());
        assert!(resource.book_path().starts_with("./resources/"));
    }
}
