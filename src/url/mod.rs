//! URL canonicalization, output filenames, and MIME classification
//!
//! Every deduplication decision in the crawl (resources, chapters, links)
//! keys off the canonical form produced here; two URLs that canonicalize
//! equal are the same cache entry by definition.

pub mod canonical;
pub mod filename;
pub mod media;

pub use canonical::{canonical_path, canonical_url};
pub use filename::{filename_for_url, safe_filename};
pub use media::{is_data_url, is_media_mime, mime_for_url, FALLBACK_MIME};
