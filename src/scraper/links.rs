//! Link graph building
//!
//! The page-side extractor reports every outbound link it keeps through the
//! `registerLink` bridge with `{url, title}`. Discoveries land in the cache
//! as placeholder [`Link`](crate::model::Link) entries; the external crawl
//! driver picks those up to visit new depths.

use crate::browser::BridgeFn;
use crate::cache::key_for;
use crate::model::{CacheEntry, Link};
use crate::scraper::Core;
use crate::url::{is_media_mime, mime_for_url};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Builds the `registerLink` bridge for one page
///
/// Behavior per discovery:
/// - known URL: append this page as a backlink, no new entry;
/// - media target (image/video/audio by inferred MIME): dropped, never a
///   crawlable link;
/// - document target: stored as a `Link` at depth `parent + 1`.
///
/// The forward-link title map accumulates in every branch; it becomes the
/// chapter's link table.
pub(crate) fn register_link_bridge(
    core: Arc<Core>,
    page_url: String,
    depth: u32,
    forward_links: Arc<Mutex<BTreeMap<String, String>>>,
) -> BridgeFn {
    Arc::new(move |payload: Value| {
        let core = core.clone();
        let page_url = page_url.clone();
        let forward_links = forward_links.clone();
        Box::pin(async move {
            let Some(url) = payload.get("url").and_then(Value::as_str) else {
                tracing::debug!("registerLink called without url: {}", payload);
                return Value::Null;
            };
            let title = payload
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let url = url.to_string();

            record_discovery(&core, &page_url, depth, &url, &title, &forward_links);
            Value::Null
        })
    })
}

/// Core of the link graph builder, separated from the bridge plumbing
pub(crate) fn record_discovery(
    core: &Core,
    page_url: &str,
    depth: u32,
    url: &str,
    title: &str,
    forward_links: &Mutex<BTreeMap<String, String>>,
) {
    let record_title = || {
        forward_links
            .lock()
            .expect("forward link lock poisoned")
            .insert(key_for(url), title.to_string());
    };

    // known target: just another backlink
    if core.cache.add_backlink(url, page_url) {
        record_title();
        return;
    }

    let mime_type = mime_for_url(url);
    if is_media_mime(&mime_type) {
        tracing::debug!("Ignoring non-document content {}", url);
        record_title();
        return;
    }

    let link = Link::new(url, page_url, depth + 1);
    if !core.cache.insert_if_absent(CacheEntry::Link(link)) {
        // raced another page to the same discovery; fold into a backlink
        core.cache.add_backlink(url, page_url);
    }
    record_title();
}
