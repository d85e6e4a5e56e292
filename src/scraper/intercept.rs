//! Network interception: per-request routing and response collection
//!
//! A [`PageNetwork`] is installed once per page and carries the page's URL,
//! so every collected resource can be tied back to the page that loaded it.
//! Interception must never hang a page: each routing step after the caller
//! hook is wrapped so a failure falls through to continuing the request
//! unmodified.

use crate::browser::{
    AbortReason, BrowserError, ConsoleLevel, ConsoleMessage, NetworkObserver, PageRequest,
    PageResponse, SyntheticResponse,
};
use crate::model::{CacheEntry, Resource};
use crate::scraper::Core;
use crate::url::{canonical_path, mime_for_url};
use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use url::Url;

/// Inert stub served in place of ad scripts
///
/// Answering with a stub (rather than blocking) keeps page scripts that
/// reference the ad API surface from breaking.
pub const AD_STUB_BODY: &str = "window.nads={createAd(){}}";

pub const AD_STUB_CONTENT_TYPE: &str = "application/x-javascript";

/// Script hosts that hijack DOM prototypes or significantly slow page loads
const AD_SCRIPT_MARKERS: &[&str] = &["nitropay", "onesignal", "doubleclick"];

/// Whether a URL is a known unwanted ad/telemetry script
pub fn is_ad_script(url: &str) -> bool {
    url.contains(".js") && AD_SCRIPT_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Whether a URL is the wiki's slow favicon
pub fn is_slow_favicon(url: &str) -> bool {
    url.contains("favicon.gif")
}

/// Network observer for one page
///
/// Wraps the shared [`Core`] with the owning page's URL; collected
/// resources are backlinked to that page so per-page cache cleaning can
/// find them later.
pub(crate) struct PageNetwork {
    core: Arc<Core>,
    page_url: String,
}

impl PageNetwork {
    pub(crate) fn new(core: Arc<Core>, page_url: String) -> Self {
        Self { core, page_url }
    }
}

#[async_trait]
impl NetworkObserver for PageNetwork {
    /// Routes one intercepted request
    ///
    /// Resolution order, first match wins: caller hook, ad-stub/favicon
    /// built-ins, book-cache short-circuit, local static file, domain
    /// rewrite, plain continue.
    async fn on_request(&self, request: Arc<dyn PageRequest>) {
        let core = &self.core;
        let url = request.url();

        if let Some(hook) = &core.options.hooks.request {
            match hook(request.clone()).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(err) => tracing::warn!("failure on request hook for {}: {:#}", url, err),
            }
        }

        match core.route_request(&url, request.as_ref()).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => tracing::warn!("unable to intercept request {}: {}", url, err),
        }

        if core.options.crawl.use_rewritten_domain {
            if let Some(rule) = &core.options.rewrite.page {
                if url.starts_with(&rule.from) {
                    let rewritten = url.replacen(&rule.from, &rule.to, 1);
                    match request.continue_with_url(&rewritten).await {
                        Ok(()) => return,
                        Err(err) => {
                            tracing::warn!(
                                "failed to continue rewritten request {}: {}",
                                url,
                                err
                            );
                        }
                    }
                }
            }
        }

        if let Err(err) = request.continue_unchanged().await {
            tracing::debug!("failed to continue request {}: {}", url, err);
        }
    }

    /// Collects one completed response into the cache
    ///
    /// First write wins per canonical URL; image and data-URL bodies are
    /// buffered eagerly, everything else is stored as metadata only. The
    /// owning page lands in the resource's backlinks either way, so
    /// [`clean_for_page`](crate::cache::ResourceCache::clean_for_page) can
    /// release page-scoped assets.
    async fn on_response(&self, response: Arc<dyn PageResponse>) {
        let core = &self.core;
        // the engine owns retry policy; anything neither OK nor cached is
        // simply not ours to record
        if !response.ok() && !response.from_cache() {
            return;
        }
        core.total_requests.fetch_add(1, Ordering::Relaxed);

        let url = response.url();
        let reported = response.mime_type();
        let mime_type = if reported.trim().is_empty() {
            mime_for_url(&url)
        } else {
            reported
        };
        let mut resource = Resource::from_response(&url, &mime_type, response.from_cache());
        resource.backlinks.push(self.page_url.clone());

        if let Some(hook) = &core.options.hooks.response {
            if let Err(err) = hook(&resource) {
                tracing::warn!("failure on response hook for {}: {:#}", url, err);
            }
        }

        // a re-fetch from another page is just another backlink
        if core.cache.contains(&url) {
            core.cache.add_backlink(&url, &self.page_url);
            return;
        }

        if resource.is_image() || resource.is_data_url() {
            match response.body().await {
                Ok(bytes) => resource.content = Some(bytes),
                // already gone, don't care about it
                Err(BrowserError::ResourceGone(_)) => return,
                Err(err) => {
                    tracing::warn!("Unable to read resource {} - {}", url, err);
                }
            }
            // NOTE buffering every image in memory grows without bound on
            // large crawls; see clean_cache_for_page for the release valve
        }

        core.cache.insert_if_absent(CacheEntry::Resource(resource));
    }

    /// Debug console forwarding
    ///
    /// Drops noisy cross-origin non-error output and the benign
    /// ERR_BLOCKED_BY_CLIENT error produced by our own favicon abort.
    fn on_console(&self, message: &ConsoleMessage) {
        let core = &self.core;
        if !core.options.browser.debug {
            return;
        }
        let foreign = message
            .origin_url
            .as_deref()
            .map(|origin| !origin.contains(&core.options.statics.prefix))
            .unwrap_or(false);
        if foreign && message.level != ConsoleLevel::Error {
            return;
        }
        if message.text.contains("ERR_BLOCKED_BY_CLIENT") {
            return;
        }
        match message.level {
            ConsoleLevel::Debug => tracing::debug!(target: "page", "{}", message.text),
            ConsoleLevel::Log | ConsoleLevel::Info => {
                tracing::info!(target: "page", "{}", message.text)
            }
            ConsoleLevel::Warn => tracing::warn!(target: "page", "{}", message.text),
            ConsoleLevel::Error => tracing::error!(target: "page", "{}", message.text),
        }
    }
}

impl Core {
    /// Steps 2-4 of request resolution; returns whether the request was
    /// handled
    async fn route_request(
        &self,
        url: &str,
        request: &dyn PageRequest,
    ) -> Result<bool, BrowserError> {
        if is_ad_script(url) {
            request
                .respond(SyntheticResponse {
                    status: 200,
                    content_type: AD_STUB_CONTENT_TYPE.to_string(),
                    body: AD_STUB_BODY.as_bytes().to_vec(),
                })
                .await?;
            return Ok(true);
        }

        if is_slow_favicon(url) {
            if let Err(err) = request.abort(AbortReason::BlockedByClient).await {
                tracing::warn!("Failed to abort request {}: {}", url, err);
            }
            return Ok(true);
        }

        // HACK dynamic content requested a second time gets stale cached
        // bytes; the book cache has no way to tell
        if let Some(cached) = self.cache.book_cache(&canonical_path(url)) {
            request
                .respond(SyntheticResponse {
                    status: 200,
                    content_type: cached.mime_type,
                    body: cached.content,
                })
                .await?;
            return Ok(true);
        }

        if let Ok(parsed) = Url::parse(url) {
            if let Some(payload) = self.server.file_for_url(&parsed).await {
                request.respond(payload).await?;
                return Ok(true);
            }
        }

        Ok(false)
    }
}
