//! Configuration loading and validation

pub mod parser;
pub mod types;
pub mod validation;

pub use parser::load_options;
pub use types::{
    BrowserOptions, CrawlOptions, HookFuture, Hooks, Options, RequestHook, ResponseHook,
    RewriteOptions, RewriteRule, StaticOptions,
};
pub use validation::validate;
