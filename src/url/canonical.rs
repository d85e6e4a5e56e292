use crate::UrlError;
use url::Url;

/// Produces the canonical string form of a URL used as the cache key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Collapse scheme: http:// becomes https://
/// 3. Lowercase the host and remove any www. prefix
/// 4. Resolve dot segments and collapse repeated slashes in the path
/// 5. Remove the trailing slash (except for the root path)
/// 6. Remove the fragment
/// 7. Sort query parameters; drop an empty query entirely
///
/// Equivalent relative/absolute spellings of the same page collapse to one
/// key, which is the binding invariant for all dedup logic.
///
/// # Examples
///
/// ```
/// use bookwright::url::canonical_url;
///
/// let key = canonical_url("http://WWW.EXAMPLE.COM/a/../page/").unwrap();
/// assert_eq!(key, "https://example.com/page");
/// ```
pub fn canonical_url(url_str: &str) -> crate::UrlResult<String> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            // set_scheme only fails for scheme-class mismatches, which
            // http -> https never is
            let _ = url.set_scheme("https");
        }
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    let mut normalized_host = host.to_lowercase();
    if let Some(stripped) = normalized_host.strip_prefix("www.") {
        normalized_host = stripped.to_string();
    }
    url.set_host(Some(&normalized_host))
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    let normalized = normalize_path(url.path());
    url.set_path(&normalized);
    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    let mut out = url.to_string();
    // Url always renders a path; strip the trailing slash unless root
    if out.ends_with('/') && url.path() != "/" {
        out.pop();
    }
    Ok(out)
}

/// Canonical path form used for the book-cache interception short-circuit
///
/// Accepts either a full URL or a bare path and returns a `./`-prefixed,
/// dot-segment-free path, matching how book paths are stored on resources.
pub fn canonical_path(url_or_path: &str) -> String {
    let path = match Url::parse(url_or_path) {
        Ok(url) => url.path().to_string(),
        Err(_) => url_or_path.to_string(),
    };
    let normalized = normalize_path(&path);
    format!(".{}", normalized)
}

/// Resolves dot segments and repeated slashes; keeps a leading slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}
