/// MIME type assumed for discovered links with no recognizable extension
///
/// Wiki pages rarely carry an extension, so the document fallback is the
/// common case for crawlable targets.
pub const FALLBACK_MIME: &str = "application/xhtml+xml";

/// Infers a MIME type from a URL's path extension, falling back to XHTML
pub fn mime_for_url(url_str: &str) -> String {
    let path = match url::Url::parse(url_str) {
        Ok(url) => url.path().to_string(),
        Err(_) => url_str.to_string(),
    };
    mime_guess::from_path(&path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// Returns true for image, video, and audio MIME types
///
/// Media targets are plain content, never crawlable links.
pub fn is_media_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
        || mime_type.starts_with("video/")
        || mime_type.starts_with("audio/")
}

/// Returns true for `data:` URLs, which carry their payload inline
pub fn is_data_url(url_str: &str) -> bool {
    url_str.starts_with("data:")
}
