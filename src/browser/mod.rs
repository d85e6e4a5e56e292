//! Rendering-engine interface
//!
//! The headless browser is an external collaborator; this module is the
//! trait boundary the crawl core drives it through. A production binding
//! adapts a DevTools-protocol client to these traits; tests supply an
//! in-memory fake. Interception callbacks are delivered on the binding's
//! own task, so observers must tolerate arbitrary interleaving.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the rendering engine binding
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("Wait condition not met within {0:?}")]
    WaitTimeout(Duration),

    #[error("Script evaluation failed: {0}")]
    Evaluate(String),

    #[error("Frame not found: {0}")]
    FrameNotFound(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The engine evicted the resource before its body could be read.
    /// Benign during response buffering.
    #[error("No resource with given identifier: {0}")]
    ResourceGone(String),

    #[error("Page already closed")]
    PageClosed,

    #[error("Engine protocol error: {0}")]
    Protocol(String),
}

/// Result type alias for rendering-engine operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// An inline response synthesized by the interceptor
#[derive(Debug, Clone)]
pub struct SyntheticResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Reason reported to the engine when aborting a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    BlockedByClient,
    Failed,
}

/// Conditions a navigation waits on before resolving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationWait {
    Load,
    DomContentLoaded,
    /// At most two in-flight network connections for half a second
    NetworkNearIdle,
}

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Debug,
    Log,
    Info,
    Warn,
    Error,
}

/// A console message emitted by page script
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
    /// URL of the script that produced the message, when known
    pub origin_url: Option<String>,
}

/// Future returned by a bridge function back into page script
pub type BridgeFuture = Pin<Box<dyn Future<Output = serde_json::Value> + Send>>;

/// A host-implemented function callable from page-side script
///
/// Payloads cross the boundary as JSON. Bridge functions never error into
/// page script; failures are mapped to empty/false/null results host-side.
pub type BridgeFn = Arc<dyn Fn(serde_json::Value) -> BridgeFuture + Send + Sync>;

/// An intercepted outbound network request
#[async_trait]
pub trait PageRequest: Send + Sync {
    fn url(&self) -> String;

    /// Answers the request with a synthesized response
    async fn respond(&self, response: SyntheticResponse) -> BrowserResult<()>;

    async fn abort(&self, reason: AbortReason) -> BrowserResult<()>;

    async fn continue_unchanged(&self) -> BrowserResult<()>;

    /// Continues the request against a rewritten URL
    async fn continue_with_url(&self, url: &str) -> BrowserResult<()>;
}

/// A completed network response
#[async_trait]
pub trait PageResponse: Send + Sync {
    fn url(&self) -> String;

    fn status(&self) -> u16;

    fn status_text(&self) -> String;

    fn ok(&self) -> bool {
        (200..300).contains(&self.status())
    }

    /// Whether the engine served this response from its own cache
    fn from_cache(&self) -> bool;

    fn mime_type(&self) -> String;

    /// Reads the response body; may fail with
    /// [`BrowserError::ResourceGone`] if the engine evicted it
    async fn body(&self) -> BrowserResult<Vec<u8>>;
}

/// Receiver for a page's network and console events
///
/// Installed once per page via [`PageHandle::enable_interception`]; no page
/// observes another page's traffic.
#[async_trait]
pub trait NetworkObserver: Send + Sync {
    async fn on_request(&self, request: Arc<dyn PageRequest>);

    async fn on_response(&self, response: Arc<dyn PageResponse>);

    fn on_console(&self, _message: &ConsoleMessage) {}
}

/// One browser tab
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Current top-level URL of the page
    fn url(&self) -> String;

    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()>;

    async fn set_viewport(&self, viewport: Viewport) -> BrowserResult<()>;

    /// Enables request interception, routing this page's network events to
    /// the observer
    async fn enable_interception(&self, observer: Arc<dyn NetworkObserver>) -> BrowserResult<()>;

    /// Registers a script evaluated before any page script on each new
    /// document
    async fn evaluate_on_new_document(&self, script: &str) -> BrowserResult<()>;

    /// Navigates and waits for the given conditions under a timeout
    ///
    /// `None` means the engine produced no top-level response (e.g. a
    /// same-document navigation).
    async fn navigate(
        &self,
        url: &str,
        wait: &[NavigationWait],
        timeout: Duration,
    ) -> BrowserResult<Option<Arc<dyn PageResponse>>>;

    async fn bring_to_front(&self) -> BrowserResult<()>;

    /// Evaluates script in the page's main frame, returning its JSON result
    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Evaluates script in the first frame whose URL contains `frame_path`
    async fn evaluate_in_frame(
        &self,
        frame_path: &str,
        script: &str,
    ) -> BrowserResult<serde_json::Value>;

    /// Exposes a host-callable bridge function to page script
    async fn expose_function(&self, name: &str, function: BridgeFn) -> BrowserResult<()>;

    /// Injects a `<script>` tag loading the given URL
    async fn add_script_tag(&self, url: &str, module: bool) -> BrowserResult<()>;

    /// Blocks until the page-side expression evaluates truthy, or the
    /// timeout elapses with [`BrowserError::WaitTimeout`]
    async fn wait_for_function(&self, expression: &str, timeout: Duration) -> BrowserResult<()>;

    /// Serializes the current DOM to a string
    async fn serialize_dom(&self) -> BrowserResult<String>;

    async fn close(&self) -> BrowserResult<()>;
}

/// The rendering engine itself
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> BrowserResult<Arc<dyn PageHandle>>;
}
