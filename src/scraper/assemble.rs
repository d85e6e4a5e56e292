//! Chapter assembly
//!
//! After formatting, a page is reduced to a [`Chapter`]: statistics from
//! the external lookup (or synthesized for system pages), tags and
//! backlinks gathered page-side, the serialized DOM, and the link maps
//! accumulated during discovery. Storage here overwrites silently; the
//! crawl driver is responsible for not double-visiting a URL.

use crate::browser::PageHandle;
use crate::config::Options;
use crate::lookup::WikiLookup;
use crate::model::{CacheEntry, Chapter, PageStats};
use crate::scraper::session::PageSession;
use crate::scraper::Core;
use crate::BookError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Site name assumed when no default origin is configured
const STOCK_SITE: &str = "scp-wiki";

/// Hosts that resolve to the stock site name
const STOCK_HOSTS: &[&str] = &[
    "scp-wiki.net",
    "www.scp-wiki.net",
    "scp-wiki.wikidot.com",
];

/// Page-side tag extraction from the wiki's tag strip
const TAGS_SCRIPT: &str = r#"(() => {
    const anchors = document.querySelectorAll('#page-content ~ .page-tags a');
    return [...anchors]
        .map(el => `${el.textContent || ''}`.trim())
        .filter(x => x);
})()"#;

/// Page-side backlink collection via the wiki's own callback machinery
///
/// The callback never fires without a session token, hence the page-side
/// timeout; every failure path resolves to an empty list.
const BACKLINKS_SCRIPT: &str = r#"(async () => {
    const timeout = 1000 * 15;
    try {
        const response = await new Promise((resolve, reject) => {
            const err = new Error('Timeout');
            err.name = 'TimeoutError';
            err.isTimeout = true;
            const timer = setTimeout(() => reject(err), timeout);
            WIKIDOT.page.callbacks.backlinksClick = res => {
                clearTimeout(timer);
                if (res.status !== 'ok') {
                    reject(new Error(`Error response: ${res.status} ${res.body.slice(0, 1000)}`));
                }
                resolve(res.body);
            };
            WIKIDOT.page.listeners.backlinksClick();
        });
        const el = document.createElement('div');
        el.innerHTML = response;
        return [...el.querySelectorAll('li a')]
            .map(el => el.getAttribute('href'))
            .filter(x => x && x.startsWith('/'));
    } catch (err) {
        if (err.isTimeout) {
            console.debug('No backlinks callback, likely because no session token');
        } else {
            console.warn(`Error in getting backlinks for ${document.location.href} ${err}`);
        }
        return [];
    }
})()"#;

/// Extracts the page's tag list; failures yield no tags
pub(crate) async fn collect_tags(session: &PageSession) -> Vec<String> {
    match session.page().evaluate(TAGS_SCRIPT).await {
        Ok(value) => string_list(&value),
        Err(err) => {
            tracing::warn!("Failed to extract tags for {}: {}", session.url(), err);
            Vec::new()
        }
    }
}

/// Collects backlinks through the wiki's callback; failures yield none
pub(crate) async fn collect_backlinks(session: &PageSession) -> Vec<String> {
    match session.page().evaluate(BACKLINKS_SCRIPT).await {
        Ok(value) => string_list(&value),
        Err(err) => {
            tracing::warn!("Failed to collect backlinks for {}: {}", session.url(), err);
            Vec::new()
        }
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Derives the default site name from the configured origin
///
/// The stock wiki origins keep the stock name; anything else is the host
/// with its structural fragments stripped.
pub(crate) fn default_site(options: &Options) -> String {
    let Some(origin) = &options.crawl.default_origin else {
        return STOCK_SITE.to_string();
    };
    let Ok(parsed) = Url::parse(origin) else {
        return STOCK_SITE.to_string();
    };
    let host = parsed.host_str().unwrap_or_default();
    if STOCK_HOSTS.contains(&host) {
        return STOCK_SITE.to_string();
    }
    let mut site = host.to_string();
    for fragment in ["www.", ".wikidot", ".com", ".net", ".org"] {
        site = site.replace(fragment, "");
    }
    if site.is_empty() {
        STOCK_SITE.to_string()
    } else {
        site
    }
}

/// Probe evaluated in-page for the wiki's own page descriptor
fn page_info_script(default_site: &str) -> String {
    format!(
        "(defaultSite => {{\n\
         const info = window.WIKIREQUEST && window.WIKIREQUEST.info;\n\
         let pageName = info && info.pageUnixName;\n\
         if (!pageName) {{\n\
         pageName = location.pathname.slice(1).replace(/[\\/\\\\() +&:]/g, '_');\n\
         }}\n\
         const pageId = (info && info.pageId) || null;\n\
         const siteName = (info && info.siteUnixName) || defaultSite;\n\
         return {{ pageName, pageId, siteName }};\n\
         }})({})",
        serde_json::to_string(default_site).unwrap_or_else(|_| "\"\"".to_string())
    )
}

/// Shared fixed date for synthetic system-page statistics
fn system_page_date() -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2008, 7, 19, 0, 0, 0).single()
}

/// Synthetic statistics for a tag-listing system page
pub(crate) fn tag_listing_stats(tag: &str, page_id: Option<u64>, site: &str) -> PageStats {
    PageStats {
        id: page_id,
        title: Some(format!("All pages tagged \"{}\"", tag)),
        kind: Some("System".to_string()),
        date: system_page_date(),
        page_name: format!("tagged_{}", tag),
        site_name: Some(site.to_string()),
        ..Default::default()
    }
}

/// Synthetic statistics for a forum-thread system page
pub(crate) fn forum_thread_stats(thread: &str, page_id: Option<u64>, site: &str) -> PageStats {
    PageStats {
        id: page_id,
        title: Some(format!("{} / Discussion", thread)),
        kind: Some("System".to_string()),
        date: system_page_date(),
        page_name: format!("forum_{}", thread),
        site_name: Some(site.to_string()),
        ..Default::default()
    }
}

/// Namespace prefixes that must not leak into output filenames
const RESERVED_PREFIXES: &[&str] = &["fragment:", "system:", "forum:"];

/// Replaces a reserved namespace separator in a looked-up page name
pub(crate) fn sanitize_page_name(stats: &mut PageStats) {
    if RESERVED_PREFIXES
        .iter()
        .any(|prefix| stats.page_name.starts_with(prefix))
    {
        tracing::warn!("Possibly invalid pagename {}", stats.page_name);
        stats.page_name = stats.page_name.replacen(':', "_", 1);
    }
}

/// Last path segment of a URL, used to name system pages
fn last_segment(url_str: &str) -> String {
    let path = Url::parse(url_str)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url_str.to_string());
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Gathers page statistics, synthesizing them for system pages
pub(crate) async fn gather_stats(
    core: &Core,
    lookup: &dyn WikiLookup,
    session: &PageSession,
) -> crate::Result<PageStats> {
    let default_site = default_site(&core.options);
    let probe = session
        .page()
        .evaluate(&page_info_script(&default_site))
        .await?;

    let page_name = probe
        .get("pageName")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let page_id = probe.get("pageId").and_then(Value::as_u64);
    let site_name = probe
        .get("siteName")
        .and_then(Value::as_str)
        .unwrap_or(&default_site)
        .to_string();

    let page_url = session.page().url();

    if page_name.starts_with("system:page-tags") {
        let tag = last_segment(&page_url);
        return Ok(tag_listing_stats(&tag, page_id, &default_site));
    }
    if page_name == "forum:thread" {
        let thread = last_segment(&page_url);
        return Ok(forum_thread_stats(&thread, page_id, &default_site));
    }

    let mut stats = lookup
        .get_stats(&page_name, page_id)
        .await
        .map_err(|err| BookError::Lookup {
            page: page_name.clone(),
            message: format!("{:#}", err),
        })?;
    stats.site_name = Some(site_name.clone());

    sanitize_page_name(&mut stats);

    if page_url.contains("/offset/") {
        tracing::warn!(
            "Offset page loaded ({}), this may overwrite its parent",
            stats.page_name
        );
    }

    if site_name != default_site {
        stats.page_name = format!("{}{}", site_name.replace('.', "_"), stats.page_name);
    }

    Ok(stats)
}

/// Serializes the final DOM, builds the chapter, and commits it
///
/// No existing-entry guard: a re-visit replaces the earlier chapter. The
/// replacement is logged so double-visits are at least observable.
pub(crate) async fn assemble_chapter(
    core: &Core,
    lookup: &dyn WikiLookup,
    session: &PageSession,
    tags: Vec<String>,
    links: BTreeMap<String, String>,
    backlinks: Vec<String>,
) -> crate::Result<Chapter> {
    let stats = gather_stats(core, lookup, session).await?;

    let content = session
        .page()
        .serialize_dom()
        .await
        .map_err(|err| BookError::Serialize {
            url: session.url().to_string(),
            message: err.to_string(),
        })?;

    let chapter = Chapter::new(
        session.url(),
        session.depth(),
        stats,
        tags,
        content,
        links,
        backlinks,
    );

    if let Some(previous) = core.cache.insert(CacheEntry::Chapter(chapter.clone())) {
        if previous.is_chapter() {
            tracing::warn!("Replacing existing chapter for {}", session.url());
        }
    }

    Ok(chapter)
}
