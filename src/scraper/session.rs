//! Page session lifecycle
//!
//! One [`PageSession`] owns one browser tab from open to close. Session
//! state moves strictly forward:
//! `Created → Navigating → Ready → Formatting → Formatted → (Skipped |
//! Finalized) → Closed`.

use crate::browser::{
    BridgeFn, Browser, BrowserError, NavigationWait, NetworkObserver, PageHandle,
};
use crate::scraper::intercept::PageNetwork;
use crate::scraper::{bridge, Core, NavigationFailure};
use crate::{BookError, ConfigError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Page-side flag the formatting barrier waits on
pub const FORMATTING_COMPLETE_EXPR: &str = "window.__bookFormattingComplete === true";

/// Path of the page-side formatter script on the static server
pub const FORMATTER_SCRIPT_PATH: &str = "/client/book-formatter.js";

/// Lifecycle state of a page session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Tab opened, interception not yet installed
    Created,
    /// Interception installed, navigation in flight
    Navigating,
    /// Navigation succeeded, bridges may be registered
    Ready,
    /// Formatter injected, waiting on the completion barrier
    Formatting,
    /// Page-side formatting finished
    Formatted,
    /// Crawl policy skipped the page before formatting
    Skipped,
    /// Chapter assembled and stored
    Finalized,
    /// Tab closed
    Closed,
}

impl SessionState {
    /// True once no further processing will happen on this page
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Finalized | Self::Closed)
    }

    pub fn is_formatted(&self) -> bool {
        matches!(self, Self::Formatted | Self::Finalized)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Navigating => "navigating",
            Self::Ready => "ready",
            Self::Formatting => "formatting",
            Self::Formatted => "formatted",
            Self::Skipped => "skipped",
            Self::Finalized => "finalized",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Result of opening a session: a ready page, or a terminal navigation
/// failure (tab already closed)
pub enum SessionStart {
    Ready(PageSession),
    Failed(NavigationFailure),
}

/// One browser tab being crawled
pub struct PageSession {
    page: Arc<dyn PageHandle>,
    url: String,
    depth: u32,
    state: SessionState,
    /// Bridge names already registered on this page; registration is
    /// idempotent across the retry paths that may re-reach it
    registered: Mutex<HashSet<String>>,
}

impl PageSession {
    /// Opens a tab, installs interception, and navigates
    ///
    /// A non-OK, non-cache top-level response is terminal for the URL: the
    /// tab is closed and the failure returned as a value. Retry, if any,
    /// belongs to the caller.
    pub(crate) async fn open(
        core: &Arc<Core>,
        browser: &Arc<dyn Browser>,
        url: &str,
        depth: u32,
    ) -> crate::Result<SessionStart> {
        let page = browser.new_page().await?;
        let mut session = Self {
            page,
            url: url.to_string(),
            depth,
            state: SessionState::Created,
            registered: Mutex::new(HashSet::new()),
        };

        session
            .page
            .set_user_agent(&core.options.browser.user_agent)
            .await?;
        let observer: Arc<dyn NetworkObserver> =
            Arc::new(PageNetwork::new(core.clone(), url.to_string()));
        session.page.enable_interception(observer).await?;

        if let Some(script) = &core.options.hooks.new_document {
            if let Err(err) = session.page.evaluate_on_new_document(script).await {
                tracing::error!("Failed to add newDocument hook: {}", err);
            }
        }

        session.advance(SessionState::Navigating);
        let timeout = Duration::from_millis(core.options.browser.timeout_ms);
        let wait = [
            NavigationWait::Load,
            NavigationWait::DomContentLoaded,
            NavigationWait::NetworkNearIdle,
        ];
        let response = match session.page.navigate(url, &wait, timeout).await {
            Ok(response) => response,
            Err(err) => {
                session.close().await;
                return Err(err.into());
            }
        };

        if let Some(response) = response {
            if !response.ok() && !response.from_cache() {
                let failure = NavigationFailure {
                    url: url.to_string(),
                    code: response.status(),
                    status_text: response.status_text(),
                };
                session.close().await;
                return Ok(SessionStart::Failed(failure));
            }
        }

        session.advance(SessionState::Ready);
        Ok(SessionStart::Ready(session))
    }

    pub fn page(&self) -> &Arc<dyn PageHandle> {
        &self.page
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Registers a bridge function at most once per page
    pub(crate) async fn expose_once(
        &self,
        name: &str,
        function: BridgeFn,
    ) -> crate::Result<()> {
        {
            let registered = self.registered.lock().expect("bridge set lock poisoned");
            if registered.contains(name) {
                return Ok(());
            }
        }
        self.page.expose_function(name, function).await?;
        self.registered
            .lock()
            .expect("bridge set lock poisoned")
            .insert(name.to_string());
        Ok(())
    }

    /// Runs the formatting pipeline against this page
    ///
    /// Registers the formatting bridges, runs the before-format hook,
    /// injects the formatter script, blocks on the completion barrier, and
    /// runs the after-format hook. A barrier timeout is fatal to this page
    /// only.
    pub(crate) async fn format(&mut self, core: &Arc<Core>) -> crate::Result<()> {
        self.advance(SessionState::Formatting);
        bridge::register_format_bridges(core, self).await?;

        if let Some(script) = &core.options.hooks.before_format {
            if let Err(err) = self.page.evaluate(script).await {
                tracing::error!("beforeFormat hook failed: {}", err);
            }
        }

        let base = self.base_url()?;
        let formatter_url = core.server.url_for_file(FORMATTER_SCRIPT_PATH, &base);
        self.page.add_script_tag(&formatter_url, true).await?;

        let timeout_ms = core.options.browser.timeout_ms;
        match self
            .page
            .wait_for_function(FORMATTING_COMPLETE_EXPR, Duration::from_millis(timeout_ms))
            .await
        {
            Ok(()) => {}
            Err(BrowserError::WaitTimeout(_)) => {
                return Err(BookError::FormattingTimeout {
                    url: self.url.clone(),
                    timeout_ms,
                });
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(script) = &core.options.hooks.after_format {
            if let Err(err) = self.page.evaluate(script).await {
                tracing::error!("afterFormat hook failed: {}", err);
            }
        }

        self.advance(SessionState::Formatted);
        Ok(())
    }

    /// Base URL the static server resolves local files against
    fn base_url(&self) -> crate::Result<Url> {
        Url::parse(&self.page.url())
            .or_else(|_| Url::parse(&self.url))
            .map_err(|_| {
                BookError::Config(ConfigError::InvalidUrl(self.url.clone()))
            })
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.advance(SessionState::Skipped);
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.advance(SessionState::Finalized);
    }

    /// Closes the tab; close failure is logged, never propagated
    pub(crate) async fn close(mut self) {
        if let Err(err) = self.page.close().await {
            tracing::warn!("Failed to close page {}: {}", self.url, err);
        }
        self.advance(SessionState::Closed);
    }

    fn advance(&mut self, to: SessionState) {
        tracing::debug!("Page {} session {} -> {}", self.url, self.state, to);
        self.state = to;
    }
}
