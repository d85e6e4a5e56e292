use crate::config::types::Options;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses an options file from the given path
///
/// Every section and field is optional; anything absent takes its
/// documented default. Hook slots are never read from the file; they are
/// set on the returned struct by the caller.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use bookwright::config::load_options;
///
/// let options = load_options(Path::new("book.toml")).unwrap();
/// println!("Concurrency: {}", options.crawl.concurrency);
/// ```
pub fn load_options(path: &Path) -> Result<Options, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let options: Options = toml::from_str(&content)?;
    validate(&options)?;
    Ok(options)
}
