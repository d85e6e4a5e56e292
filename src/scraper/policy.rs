//! Crawl skip policy
//!
//! Decided per page, just before formatting. Never cached: tag semantics
//! belong to the external metadata service and may change under us.

use crate::lookup::WikiLookup;

/// Whether to skip a page before formatting
///
/// The root page always formats, whatever the threshold; near-root pages
/// (depth below the threshold) do too. Deeper pages are skipped exactly
/// when the metadata service classifies their tag set as meta content.
pub fn should_skip(
    depth: u32,
    tags: &[String],
    lookup: &dyn WikiLookup,
    skip_meta_depth: u32,
) -> bool {
    if depth == 0 || depth < skip_meta_depth {
        return false;
    }
    lookup.has_meta_tag(tags)
}
