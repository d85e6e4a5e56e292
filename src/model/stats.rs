use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page statistics returned by the external metadata lookup
///
/// System pages (tag listings, forum threads) get synthetic stats built by
/// the chapter assembler instead of a lookup round trip; `kind` is "System"
/// for those.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageStats {
    /// Wiki-internal page id, when known
    pub id: Option<u64>,
    pub title: Option<String>,
    /// Secondary title (e.g. an SCP's object name)
    pub alt_title: Option<String>,
    pub author: Option<String>,
    pub kind: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub rating: Option<i64>,
    pub score: Option<f64>,
    /// Unix name of the page, the basis for its output filename
    pub page_name: String,
    /// Unix name of the site the page belongs to
    pub site_name: Option<String>,
    /// Anything else the lookup reports, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PageStats {
    /// Display title: the title (or page name) plus any alt-title
    pub fn display_title(&self) -> String {
        let primary = self
            .title
            .clone()
            .unwrap_or_else(|| self.page_name.clone());
        match &self.alt_title {
            Some(alt) if !alt.trim().is_empty() => format!("{} - {}", primary.trim(), alt.trim()),
            _ => primary.trim().to_string(),
        }
    }
}
