use url::Url;

/// Characters replaced by underscores in output filenames
fn is_unsafe(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Transforms an arbitrary page name into a filesystem-safe filename
///
/// Unsafe characters (path separators, spaces, punctuation used by wiki
/// namespaces) become underscores. An optional extension is appended,
/// accepted with or without a leading dot.
///
/// # Examples
///
/// ```
/// use bookwright::url::safe_filename;
///
/// assert_eq!(safe_filename("system:page-tags", "xhtml"), "system_page-tags.xhtml");
/// assert_eq!(safe_filename("scp-173", ".xhtml"), "scp-173.xhtml");
/// ```
pub fn safe_filename(name: &str, ext: &str) -> String {
    let mut base: String = name
        .trim()
        .chars()
        .map(|c| if is_unsafe(c) { '_' } else { c })
        .collect();
    if base.is_empty() {
        base.push_str("untitled");
    }
    if ext.is_empty() {
        return base;
    }
    format!("{}.{}", base, ext.trim_start_matches('.'))
}

/// Derives a filesystem-safe filename from a URL
///
/// Uses the URL path (with the host as a fallback for root URLs); relative
/// inputs are sanitized as-is. Used for link ids and placeholder filenames
/// before a page's real name is known.
pub fn filename_for_url(url_str: &str, ext: &str) -> String {
    let base = match Url::parse(url_str) {
        Ok(url) => {
            let path = url.path().trim_matches('/').to_string();
            if path.is_empty() {
                url.host_str().unwrap_or("index").to_string()
            } else {
                path
            }
        }
        Err(_) => url_str.trim_matches('/').to_string(),
    };
    safe_filename(&base, ext)
}
