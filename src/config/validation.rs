use crate::config::types::{Options, RewriteRule};
use crate::ConfigError;
use url::Url;

/// Validates a loaded options structure
///
/// Checks the constraints the rest of the crate relies on: non-zero
/// timeout and concurrency, a usable static prefix, and parseable rewrite
/// and origin URLs.
pub fn validate(options: &Options) -> Result<(), ConfigError> {
    if options.browser.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "browser.timeout-ms must be greater than 0".to_string(),
        ));
    }

    if options.browser.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "browser.user-agent must not be empty".to_string(),
        ));
    }

    if options.crawl.concurrency == 0 {
        return Err(ConfigError::Validation(
            "crawl.concurrency must be at least 1".to_string(),
        ));
    }

    if options.statics.prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "static.prefix must not be empty".to_string(),
        ));
    }

    if let Some(origin) = &options.crawl.default_origin {
        Url::parse(origin).map_err(|_| ConfigError::InvalidUrl(origin.clone()))?;
    }

    if let Some(rule) = &options.rewrite.page {
        validate_rewrite(rule)?;
    }
    // the files rule is a host substring pair, not full URLs
    if let Some(rule) = &options.rewrite.files {
        if rule.from.trim().is_empty() || rule.to.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rewrite.files requires non-empty from/to hosts".to_string(),
            ));
        }
    }

    if options.crawl.use_rewritten_domain && options.rewrite.page.is_none() {
        return Err(ConfigError::Validation(
            "crawl.use-rewritten-domain requires a [rewrite.page] rule".to_string(),
        ));
    }

    Ok(())
}

fn validate_rewrite(rule: &RewriteRule) -> Result<(), ConfigError> {
    Url::parse(&rule.from).map_err(|_| ConfigError::InvalidUrl(rule.from.clone()))?;
    Url::parse(&rule.to).map_err(|_| ConfigError::InvalidUrl(rule.to.clone()))?;
    Ok(())
}
