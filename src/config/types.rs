use crate::browser::PageRequest;
use crate::model::Resource;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Main options structure for a scrape run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Options {
    pub browser: BrowserOptions,
    pub crawl: CrawlOptions,
    #[serde(rename = "static")]
    pub statics: StaticOptions,
    pub rewrite: RewriteOptions,
    /// Caller-supplied hooks; not part of the config file
    #[serde(skip)]
    pub hooks: Hooks,
}

/// Rendering-engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Navigation and formatting timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// User agent string presented to the wiki
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Run the engine without a visible window
    pub headless: bool,

    /// Forward page console output and keep tabs open for inspection
    pub debug: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10 * 60 * 1000,
            user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Googlebot Chrome/76.0.3809.132 Safari/537.36"
                    .to_string(),
            headless: true,
            debug: false,
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Maximum number of concurrently open pages
    pub concurrency: u32,

    /// Continue matching requests against the rewritten domain
    #[serde(rename = "use-rewritten-domain")]
    pub use_rewritten_domain: bool,

    /// Collect backlinks before formatting each page
    pub backlinks: bool,

    /// Extract page tags before formatting each page
    pub tags: bool,

    /// Close each tab once its chapter is stored
    #[serde(rename = "close-tabs")]
    pub close_tabs: bool,

    /// Depth at or beyond which meta-tagged pages are skipped
    #[serde(rename = "skip-meta-depth")]
    pub skip_meta_depth: u32,

    /// Origin of the default wiki site, for site-prefix adjustment
    #[serde(rename = "default-origin")]
    pub default_origin: Option<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            use_rewritten_domain: false,
            backlinks: false,
            tags: true,
            close_tabs: true,
            skip_meta_depth: 1,
            default_origin: None,
        }
    }
}

/// Static file serving configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticOptions {
    /// URL prefix local files are served under
    pub prefix: String,

    /// Root directory local files come from
    pub root: String,

    /// Let the engine cache served files
    pub cache: bool,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            prefix: "__book__".to_string(),
            root: ".".to_string(),
            cache: true,
        }
    }
}

/// A source-domain to target-domain rewrite pair
#[derive(Debug, Clone, Deserialize)]
pub struct RewriteRule {
    pub from: String,
    pub to: String,
}

/// Domain rewrite configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Rewrite applied to page requests when `use-rewritten-domain` is set
    pub page: Option<RewriteRule>,

    /// Host variant checked when a forced image download lands under the
    /// wiki's file-serving domain instead of the page domain
    pub files: Option<RewriteRule>,
}

/// Future returned by an async hook
pub type HookFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

/// Caller hook inspecting (and optionally fully handling) an intercepted
/// request; returns true when the request was handled
pub type RequestHook = Arc<dyn Fn(Arc<dyn PageRequest>) -> HookFuture<bool> + Send + Sync>;

/// Caller hook inspecting a collected resource before it is cached
pub type ResponseHook = Arc<dyn Fn(&Resource) -> anyhow::Result<()> + Send + Sync>;

/// Caller-supplied hook slots
///
/// The page-side slots are script sources evaluated in the page; the
/// host-side slots are closures. Every slot defaults to a no-op, and every
/// invocation is caught and logged; a failing hook never aborts a page.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Script evaluated on every new document, before page scripts run
    pub new_document: Option<String>,

    /// Script evaluated just before the formatter is injected
    pub before_format: Option<String>,

    /// Script evaluated after formatting completes
    pub after_format: Option<String>,

    pub request: Option<RequestHook>,

    pub response: Option<ResponseHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("new_document", &self.new_document.is_some())
            .field("before_format", &self.before_format.is_some())
            .field("after_format", &self.after_format.is_some())
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}
