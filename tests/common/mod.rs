//! In-memory fakes for the external collaborators
//!
//! The fake rendering engine models a wiki as a map of URL to page
//! description. Navigation delivers the page's subresource responses to
//! the installed observer, formatter injection replays the page's links
//! through the `registerLink` bridge, and the image rewrite pass calls
//! `keepThisImage` for every image the page declares. Requests and
//! responses driven by hand record what the interceptor did with them.
#![allow(dead_code)]

use async_trait::async_trait;
use bookwright::browser::{
    AbortReason, BridgeFn, Browser, BrowserError, BrowserResult, NavigationWait, NetworkObserver,
    PageHandle, PageRequest, PageResponse, SyntheticResponse, Viewport,
};
use bookwright::lookup::WikiLookup;
use bookwright::model::PageStats;
use bookwright::staticfiles::StaticFileServer;
use bookwright::{MemoryCache, Options, Scraper};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

/// A subresource the fake site serves for a page
#[derive(Debug, Clone)]
pub struct ResourceModel {
    pub url: String,
    pub mime_type: String,
    pub body: Option<Vec<u8>>,
    pub from_cache: bool,
    pub gone: bool,
}

impl ResourceModel {
    pub fn image(url: &str, body: &[u8]) -> Self {
        Self {
            url: url.to_string(),
            mime_type: "image/png".to_string(),
            body: Some(body.to_vec()),
            from_cache: false,
            gone: false,
        }
    }
}

/// One page of the fake wiki
#[derive(Debug, Clone, Default)]
pub struct PageModel {
    pub status: u16,
    pub status_text: String,
    pub tags: Vec<String>,
    pub backlinks: Vec<String>,
    /// Outbound links replayed through `registerLink` on formatter injection
    pub links: Vec<(String, String)>,
    /// Image URLs fed to `keepThisImage` during the rewrite pass
    pub images: Vec<String>,
    /// Responses delivered to the observer during navigation
    pub resources: Vec<ResourceModel>,
    /// Responses delivered only when a forced image load asks for them
    pub lazy_resources: Vec<ResourceModel>,
    /// Sub-frame contents keyed by frame path
    pub frames: HashMap<String, String>,
    pub page_name: String,
    pub page_id: Option<u64>,
    pub site_name: String,
    pub serialized: String,
    /// Whether injecting the formatter raises the completion flag
    pub complete_on_inject: bool,
}

impl PageModel {
    pub fn ok(page_name: &str) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            page_name: page_name.to_string(),
            site_name: "scp-wiki".to_string(),
            serialized: format!("<html><body>{}</body></html>", page_name),
            complete_on_inject: true,
            ..Default::default()
        }
    }

    pub fn failing(status: u16, status_text: &str) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            ..Default::default()
        }
    }
}

/// The fake wiki itself
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, PageModel>>,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_page(&self, url: &str, page: PageModel) {
        self.pages
            .lock()
            .expect("site lock poisoned")
            .insert(url.to_string(), page);
    }

    fn page(&self, url: &str) -> Option<PageModel> {
        self.pages
            .lock()
            .expect("site lock poisoned")
            .get(url)
            .cloned()
    }
}

pub struct FakeBrowser {
    site: Arc<FakeSite>,
    pages: Mutex<Vec<Arc<FakePage>>>,
}

impl FakeBrowser {
    pub fn new(site: Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self {
            site,
            pages: Mutex::new(Vec::new()),
        })
    }

    /// Every tab this browser has opened, in order
    pub fn pages(&self) -> Vec<Arc<FakePage>> {
        self.pages.lock().expect("page list lock poisoned").clone()
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self) -> BrowserResult<Arc<dyn PageHandle>> {
        let page = Arc::new(FakePage::new(self.site.clone()));
        self.pages
            .lock()
            .expect("page list lock poisoned")
            .push(page.clone());
        Ok(page)
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    url: Mutex<String>,
    observer: Mutex<Option<Arc<dyn NetworkObserver>>>,
    bridges: Mutex<HashMap<String, BridgeFn>>,
    scripts: Mutex<Vec<String>>,
    exposed: Mutex<Vec<String>>,
    user_agent: Mutex<Option<String>>,
    closed: AtomicBool,
    formatted: AtomicBool,
}

impl FakePage {
    fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            url: Mutex::new(String::new()),
            observer: Mutex::new(None),
            bridges: Mutex::new(HashMap::new()),
            scripts: Mutex::new(Vec::new()),
            exposed: Mutex::new(Vec::new()),
            user_agent: Mutex::new(None),
            closed: AtomicBool::new(false),
            formatted: AtomicBool::new(false),
        }
    }

    pub fn observer(&self) -> Option<Arc<dyn NetworkObserver>> {
        self.observer.lock().expect("observer lock poisoned").clone()
    }

    pub fn bridge(&self, name: &str) -> Option<BridgeFn> {
        self.bridges
            .lock()
            .expect("bridge lock poisoned")
            .get(name)
            .cloned()
    }

    /// Every script evaluated or injected, in order
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().expect("script lock poisoned").clone()
    }

    /// Bridge names as registered, one item per `expose_function` call
    pub fn exposed(&self) -> Vec<String> {
        self.exposed.lock().expect("exposed lock poisoned").clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn user_agent(&self) -> Option<String> {
        self.user_agent.lock().expect("ua lock poisoned").clone()
    }

    fn record(&self, script: &str) {
        self.scripts
            .lock()
            .expect("script lock poisoned")
            .push(script.to_string());
    }

    fn current_page(&self) -> Option<PageModel> {
        let current = self.url.lock().expect("url lock poisoned").clone();
        self.site.page(&current)
    }
}

#[async_trait]
impl PageHandle for FakePage {
    fn url(&self) -> String {
        self.url.lock().expect("url lock poisoned").clone()
    }

    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()> {
        *self.user_agent.lock().expect("ua lock poisoned") = Some(user_agent.to_string());
        Ok(())
    }

    async fn set_viewport(&self, _viewport: Viewport) -> BrowserResult<()> {
        Ok(())
    }

    async fn enable_interception(&self, observer: Arc<dyn NetworkObserver>) -> BrowserResult<()> {
        *self.observer.lock().expect("observer lock poisoned") = Some(observer);
        Ok(())
    }

    async fn evaluate_on_new_document(&self, script: &str) -> BrowserResult<()> {
        self.record(script);
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        _wait: &[NavigationWait],
        _timeout: Duration,
    ) -> BrowserResult<Option<Arc<dyn PageResponse>>> {
        *self.url.lock().expect("url lock poisoned") = url.to_string();
        let page = self
            .site
            .page(url)
            .ok_or_else(|| BrowserError::Protocol(format!("no page model for {}", url)))?;

        let observer = self.observer();
        if let Some(observer) = &observer {
            for resource in &page.resources {
                observer
                    .on_response(Arc::new(FakeResponse::from_model(resource)))
                    .await;
            }
        }

        Ok(Some(Arc::new(FakeResponse {
            url: url.to_string(),
            status: page.status,
            status_text: page.status_text.clone(),
            mime_type: "text/html".to_string(),
            body: None,
            from_cache: false,
            gone: false,
        })))
    }

    async fn bring_to_front(&self) -> BrowserResult<()> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<Value> {
        self.record(script);
        let page = self.current_page().unwrap_or_default();

        if script.contains(".page-tags") {
            return Ok(Value::Array(
                page.tags.iter().cloned().map(Value::String).collect(),
            ));
        }
        if script.contains("backlinksClick") {
            return Ok(Value::Array(
                page.backlinks.iter().cloned().map(Value::String).collect(),
            ));
        }
        if script.contains("WIKIREQUEST") {
            return Ok(serde_json::json!({
                "pageName": page.page_name,
                "pageId": page.page_id,
                "siteName": page.site_name,
            }));
        }
        if script.contains("document.images") {
            let bridge = self.bridge("keepThisImage");
            if let Some(bridge) = bridge {
                for image in &page.images {
                    let _ = bridge(Value::String(image.clone())).await;
                }
            }
            return Ok(Value::Null);
        }
        if script.contains("new Image()") {
            let observer = self.observer();
            if let Some(observer) = &observer {
                for resource in page.lazy_resources.iter().chain(page.resources.iter()) {
                    if script.contains(&resource.url) {
                        observer
                            .on_response(Arc::new(FakeResponse::from_model(resource)))
                            .await;
                    }
                }
            }
            return Ok(Value::Bool(true));
        }
        Ok(Value::Null)
    }

    async fn evaluate_in_frame(&self, frame_path: &str, script: &str) -> BrowserResult<Value> {
        self.record(script);
        let page = self.current_page().unwrap_or_default();
        match page.frames.get(frame_path) {
            Some(contents) if script.contains("innerHTML") => {
                Ok(Value::String(contents.clone()))
            }
            Some(_) => Ok(Value::Null),
            None => Err(BrowserError::FrameNotFound(frame_path.to_string())),
        }
    }

    async fn expose_function(&self, name: &str, function: BridgeFn) -> BrowserResult<()> {
        self.exposed
            .lock()
            .expect("exposed lock poisoned")
            .push(name.to_string());
        self.bridges
            .lock()
            .expect("bridge lock poisoned")
            .insert(name.to_string(), function);
        Ok(())
    }

    async fn add_script_tag(&self, url: &str, _module: bool) -> BrowserResult<()> {
        self.record(&format!("<script src=\"{}\">", url));
        if !url.contains("book-formatter") {
            return Ok(());
        }
        let page = self.current_page().unwrap_or_default();
        if let Some(bridge) = self.bridge("registerLink") {
            for (href, title) in &page.links {
                let _ = bridge(serde_json::json!({ "url": href, "title": title })).await;
            }
        }
        if page.complete_on_inject {
            self.formatted.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn wait_for_function(&self, expression: &str, timeout: Duration) -> BrowserResult<()> {
        if !expression.contains("__bookFormattingComplete") {
            return Err(BrowserError::Evaluate(format!(
                "unknown wait expression: {}",
                expression
            )));
        }
        let started = Instant::now();
        loop {
            if self.formatted.load(Ordering::SeqCst) {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserError::WaitTimeout(timeout));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn serialize_dom(&self) -> BrowserResult<String> {
        let page = self.current_page().unwrap_or_default();
        Ok(page.serialized)
    }

    async fn close(&self) -> BrowserResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// What the interceptor did with a hand-driven request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Taken {
    Responded {
        status: u16,
        content_type: String,
        body: Vec<u8>,
    },
    Aborted(AbortReason),
    Continued,
    Redirected(String),
}

pub struct FakeRequest {
    url: String,
    taken: Mutex<Option<Taken>>,
}

impl FakeRequest {
    pub fn new(url: &str) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            taken: Mutex::new(None),
        })
    }

    pub fn taken(&self) -> Option<Taken> {
        self.taken.lock().expect("taken lock poisoned").clone()
    }

    fn take(&self, action: Taken) {
        *self.taken.lock().expect("taken lock poisoned") = Some(action);
    }
}

#[async_trait]
impl PageRequest for FakeRequest {
    fn url(&self) -> String {
        self.url.clone()
    }

    async fn respond(&self, response: SyntheticResponse) -> BrowserResult<()> {
        self.take(Taken::Responded {
            status: response.status,
            content_type: response.content_type,
            body: response.body,
        });
        Ok(())
    }

    async fn abort(&self, reason: AbortReason) -> BrowserResult<()> {
        self.take(Taken::Aborted(reason));
        Ok(())
    }

    async fn continue_unchanged(&self) -> BrowserResult<()> {
        self.take(Taken::Continued);
        Ok(())
    }

    async fn continue_with_url(&self, url: &str) -> BrowserResult<()> {
        self.take(Taken::Redirected(url.to_string()));
        Ok(())
    }
}

pub struct FakeResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub mime_type: String,
    pub body: Option<Vec<u8>>,
    pub from_cache: bool,
    pub gone: bool,
}

impl FakeResponse {
    fn from_model(model: &ResourceModel) -> Self {
        Self {
            url: model.url.clone(),
            status: 200,
            status_text: "OK".to_string(),
            mime_type: model.mime_type.clone(),
            body: model.body.clone(),
            from_cache: model.from_cache,
            gone: model.gone,
        }
    }

    pub fn image(url: &str, body: &[u8]) -> Arc<Self> {
        Arc::new(Self::from_model(&ResourceModel::image(url, body)))
    }

    pub fn with_status(url: &str, status: u16, status_text: &str) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            status,
            status_text: status_text.to_string(),
            mime_type: "text/html".to_string(),
            body: None,
            from_cache: false,
            gone: false,
        })
    }
}

#[async_trait]
impl PageResponse for FakeResponse {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> String {
        self.status_text.clone()
    }

    fn from_cache(&self) -> bool {
        self.from_cache
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    async fn body(&self) -> BrowserResult<Vec<u8>> {
        if self.gone {
            return Err(BrowserError::ResourceGone(self.url.clone()));
        }
        Ok(self.body.clone().unwrap_or_default())
    }
}

/// Metadata lookup backed by a name-to-stats map
///
/// Unknown pages answer with bare stats carrying only the page name, so
/// most tests need no explicit setup.
pub struct FakeLookup {
    stats: Mutex<HashMap<String, PageStats>>,
    meta_tags: Vec<String>,
    lookups: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new() -> Arc<Self> {
        Self::with_meta_tags(&[])
    }

    pub fn with_meta_tags(tags: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            stats: Mutex::new(HashMap::new()),
            meta_tags: tags.iter().map(|t| t.to_string()).collect(),
            lookups: Mutex::new(Vec::new()),
        })
    }

    pub fn add_stats(&self, page_name: &str, stats: PageStats) {
        self.stats
            .lock()
            .expect("stats lock poisoned")
            .insert(page_name.to_string(), stats);
    }

    /// Page names looked up so far, in order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lookup log poisoned").clone()
    }
}

#[async_trait]
impl WikiLookup for FakeLookup {
    async fn get_stats(
        &self,
        page_name: &str,
        page_id: Option<u64>,
    ) -> anyhow::Result<PageStats> {
        self.lookups
            .lock()
            .expect("lookup log poisoned")
            .push(page_name.to_string());
        let known = self
            .stats
            .lock()
            .expect("stats lock poisoned")
            .get(page_name)
            .cloned();
        Ok(known.unwrap_or_else(|| PageStats {
            id: page_id,
            page_name: page_name.to_string(),
            ..Default::default()
        }))
    }

    fn has_meta_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.meta_tags.contains(tag))
    }
}

/// Static file server backed by a path-to-payload map
///
/// Files register under their plain path; lookups accept both the plain
/// path and the prefixed form the page-facing URLs carry. A formatter
/// script is preloaded so the formatting pipeline works out of the box.
pub struct FakeStatic {
    prefix: String,
    files: Mutex<HashMap<String, SyntheticResponse>>,
}

pub const FORMATTER_BODY: &[u8] = b"export default function format() {}";

impl FakeStatic {
    pub fn new() -> Arc<Self> {
        let server = Self {
            prefix: "__book__".to_string(),
            files: Mutex::new(HashMap::new()),
        };
        server.add_file(
            "/client/book-formatter.js",
            "application/javascript",
            FORMATTER_BODY,
        );
        Arc::new(server)
    }

    pub fn add_file(&self, path: &str, content_type: &str, body: &[u8]) {
        self.files.lock().expect("file lock poisoned").insert(
            path.to_string(),
            SyntheticResponse {
                status: 200,
                content_type: content_type.to_string(),
                body: body.to_vec(),
            },
        );
    }
}

#[async_trait]
impl StaticFileServer for FakeStatic {
    async fn file_for_url(&self, url: &Url) -> Option<SyntheticResponse> {
        let path = url.path();
        let marker = format!("/{}/", self.prefix);
        let plain = path
            .strip_prefix(marker.as_str())
            .map(|rest| format!("/{}", rest))
            .unwrap_or_else(|| path.to_string());
        self.files
            .lock()
            .expect("file lock poisoned")
            .get(&plain)
            .cloned()
    }

    fn url_for_file(&self, path: &str, base: &Url) -> String {
        format!(
            "{}/{}{}",
            base.origin().ascii_serialization(),
            self.prefix,
            path
        )
    }
}

/// Log output for failing scenarios: set RUST_LOG and rerun with
/// `-- --nocapture`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Everything one scenario needs, wired together
pub struct Harness {
    pub scraper: Scraper,
    pub cache: Arc<MemoryCache>,
    pub browser: Arc<FakeBrowser>,
    pub lookup: Arc<FakeLookup>,
    pub server: Arc<FakeStatic>,
    pub site: Arc<FakeSite>,
}

impl Harness {
    pub fn new(options: Options) -> Self {
        Self::with_lookup(options, FakeLookup::new())
    }

    pub fn with_lookup(options: Options, lookup: Arc<FakeLookup>) -> Self {
        init_tracing();
        let site = FakeSite::new();
        let browser = FakeBrowser::new(site.clone());
        let cache = Arc::new(MemoryCache::new());
        let server = FakeStatic::new();
        let scraper = Scraper::new(
            browser.clone(),
            cache.clone(),
            lookup.clone(),
            server.clone(),
            options,
        );
        Self {
            scraper,
            cache,
            browser,
            lookup,
            server,
            site,
        }
    }

    /// The network observer installed on the most recently opened tab
    pub fn observer(&self) -> Arc<dyn NetworkObserver> {
        let pages = self.browser.pages();
        pages
            .last()
            .expect("no page opened yet")
            .observer()
            .expect("interception not installed")
    }
}
