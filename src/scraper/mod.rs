//! Crawl orchestration
//!
//! [`Scraper`] drives one page load end to end: open a tab with
//! interception installed, navigate, discover links through the page-side
//! bridge, decide skip-vs-format, run the formatting pipeline, and commit
//! the finished chapter to the shared cache. The top-level crawl driver
//! re-invokes [`Scraper::load_page`] for every discovered link/depth pair;
//! this module never queues work itself.

pub mod assemble;
pub mod bridge;
pub mod intercept;
pub mod links;
pub mod policy;
pub mod session;

use crate::browser::{Browser, PageHandle};
use crate::cache::ResourceCache;
use crate::config::Options;
use crate::lookup::WikiLookup;
use crate::model::{CacheEntry, Chapter};
use crate::staticfiles::StaticFileServer;
use session::{PageSession, SessionStart};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

/// A top-level navigation that came back non-OK
///
/// Returned as a value, not an error: the caller owns retry/skip policy for
/// failed URLs. The page is already closed by the time this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationFailure {
    pub url: String,
    pub code: u16,
    pub status_text: String,
}

impl std::fmt::Display for NavigationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} for {}", self.code, self.status_text, self.url)
    }
}

/// Result of a single page load
#[derive(Debug)]
pub enum LoadOutcome {
    /// Page was crawled, formatted, and stored
    Chapter(Chapter),
    /// Crawl policy skipped the page before formatting; nothing stored
    Skipped,
    /// Top-level navigation failed; nothing stored
    Failed(NavigationFailure),
}

/// Shared state reachable from interception callbacks and bridges
///
/// Interception runs on the engine binding's delivery task, concurrently
/// with the page task, so everything here is either immutable, atomic, or
/// synchronized by the cache itself.
pub(crate) struct Core {
    pub(crate) options: Options,
    pub(crate) cache: Arc<dyn ResourceCache>,
    pub(crate) server: Arc<dyn StaticFileServer>,
    /// Successful network responses seen, diagnostics only
    pub(crate) total_requests: AtomicU64,
}

/// The crawl orchestrator
///
/// All collaborators are explicit constructor dependencies; there is no
/// ambient shared state.
pub struct Scraper {
    core: Arc<Core>,
    browser: Arc<dyn Browser>,
    lookup: Arc<dyn WikiLookup>,
    /// Serializes foreground focus across every open page
    front_lock: Arc<AsyncMutex<()>>,
}

impl Scraper {
    pub fn new(
        browser: Arc<dyn Browser>,
        cache: Arc<dyn ResourceCache>,
        lookup: Arc<dyn WikiLookup>,
        server: Arc<dyn StaticFileServer>,
        options: Options,
    ) -> Self {
        Self {
            core: Arc::new(Core {
                options,
                cache,
                server,
                total_requests: AtomicU64::new(0),
            }),
            browser,
            lookup,
            front_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Crawls a single page and stores the result
    ///
    /// The full pipeline: open a tab with interception installed, navigate,
    /// register the link-discovery bridge, gather backlinks/tags, consult
    /// the skip policy, format, localize images, assemble and store the
    /// chapter. Navigation failure is surfaced in the outcome; a formatting
    /// timeout is an error fatal to this page only.
    pub async fn load_page(&self, url: &str, depth: u32) -> crate::Result<LoadOutcome> {
        let mut session = match PageSession::open(&self.core, &self.browser, url, depth).await? {
            SessionStart::Ready(session) => session,
            SessionStart::Failed(failure) => return Ok(LoadOutcome::Failed(failure)),
        };

        self.bring_to_front(&session).await;

        // Link discoveries land here as the page-side extractor walks the DOM
        let forward_links = Arc::new(Mutex::new(BTreeMap::new()));
        session
            .expose_once(
                "registerLink",
                links::register_link_bridge(
                    self.core.clone(),
                    url.to_string(),
                    depth,
                    forward_links.clone(),
                ),
            )
            .await?;

        let backlinks = if self.core.options.crawl.backlinks {
            assemble::collect_backlinks(&session).await
        } else {
            Vec::new()
        };
        let tags = if self.core.options.crawl.tags {
            assemble::collect_tags(&session).await
        } else {
            Vec::new()
        };

        if policy::should_skip(
            depth,
            &tags,
            self.lookup.as_ref(),
            self.core.options.crawl.skip_meta_depth,
        ) {
            tracing::info!("Skipping page {} due to tags", url);
            session.mark_skipped();
            self.close_session(session).await;
            return Ok(LoadOutcome::Skipped);
        }

        session.format(&self.core).await?;
        bridge::switch_images_to_local(&self.core, &session).await?;

        let links_snapshot = forward_links.lock().expect("forward link lock poisoned").clone();
        let chapter = assemble::assemble_chapter(
            &self.core,
            self.lookup.as_ref(),
            &session,
            tags,
            links_snapshot,
            backlinks,
        )
        .await?;

        session.mark_finalized();
        self.close_session(session).await;
        Ok(LoadOutcome::Chapter(chapter))
    }

    /// Brings a page to the foreground, strictly serialized across pages
    ///
    /// At most one focus operation runs at a time; each is followed by a
    /// short settling delay. Focus failure is logged, never fatal.
    pub async fn bring_to_front(&self, session: &PageSession) {
        let _guard = self.front_lock.lock().await;
        if let Err(err) = session.page().bring_to_front().await {
            tracing::warn!("Failed to bring page to front: {}", err);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    /// Closes the tab unless configured to keep it open for inspection
    async fn close_session(&self, session: PageSession) {
        let opts = &self.core.options;
        let keep_open_for_debug = opts.browser.debug && !opts.browser.headless;
        if opts.crawl.close_tabs && !keep_open_for_debug {
            session.close().await;
        }
    }

    /// Entries marked for export, the input to book packaging
    pub fn resources(&self) -> Vec<CacheEntry> {
        self.core.cache.saved()
    }

    /// Drops unsaved page-scoped cache entries for a finished page
    pub fn clean_cache_for_page(&self, url: &str) {
        self.core.cache.clean_for_page(url);
    }

    /// Total successful network responses observed so far
    ///
    /// Best-effort diagnostic counter; not synchronized with anything.
    pub fn total_requests(&self) -> u64 {
        self.core.total_requests.load(Ordering::Relaxed)
    }

    pub fn options(&self) -> &Options {
        &self.core.options
    }
}
