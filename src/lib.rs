//! Bookwright: a wiki-to-book crawl orchestrator
//!
//! This crate drives a headless rendering engine over a wiki link graph,
//! capturing page content and binary assets and assembling them into
//! cross-referenced chapters suitable for offline packaging. The rendering
//! engine, metadata lookup, and static file server are external collaborators
//! consumed through traits; this crate owns the crawl orchestration, request
//! interception, and shared resource cache semantics.

pub mod browser;
pub mod cache;
pub mod config;
pub mod lookup;
pub mod model;
pub mod scraper;
pub mod staticfiles;
pub mod url;

use thiserror::Error;

/// Main error type for Bookwright operations
#[derive(Debug, Error)]
pub enum BookError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rendering engine error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Formatting did not complete for {url} within {timeout_ms}ms")]
    FormattingTimeout { url: String, timeout_ms: u64 },

    #[error("Metadata lookup failed for {page}: {message}")]
    Lookup { page: String, message: String },

    #[error("Page serialization failed for {url}: {message}")]
    Serialize { url: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Bookwright operations
pub type Result<T> = std::result::Result<T, BookError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::{MemoryCache, ResourceCache};
pub use config::Options;
pub use model::{CacheEntry, Chapter, Link, PageStats, Resource};
pub use scraper::{LoadOutcome, NavigationFailure, Scraper};
pub use url::{canonical_path, canonical_url, filename_for_url, safe_filename};
