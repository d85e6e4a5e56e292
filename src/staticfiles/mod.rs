//! Static file server interface
//!
//! Local assets (the page-side formatter script, fonts, styles) are served
//! into the page by an external static file collaborator; requests for them
//! are answered during interception instead of going to the network.

use crate::browser::SyntheticResponse;
use async_trait::async_trait;
use url::Url;

/// External local-file server
#[async_trait]
pub trait StaticFileServer: Send + Sync {
    /// Payload for a URL that maps to a local file, or `None` when the URL
    /// is not ours to serve
    async fn file_for_url(&self, url: &Url) -> Option<SyntheticResponse>;

    /// URL under which a local file is reachable from a page at `base`
    fn url_for_file(&self, path: &str, base: &Url) -> String;
}
