use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use ruling_engine::CrawlConfig;
use ruling_logging::{crawl_info, crawl_warn};

/// Reads the crawl configuration from a RON file. Without a path, or when the
/// file does not exist, the defaults apply; a file that exists but does not
/// parse is an error.
pub fn load(path: Option<&Path>) -> anyhow::Result<CrawlConfig> {
    let Some(path) = path else {
        return Ok(CrawlConfig::default());
    };
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            crawl_warn!("config file {} not found; using defaults", path.display());
            return Ok(CrawlConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let config: CrawlConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    crawl_info!("loaded config from {}", path.display());
    Ok(config)
}
