//! Run configuration. Every group deserializes with defaults, so a config
//! file only needs the fields it overrides.
use std::path::PathBuf;
use std::time::Duration;

use ruling_core::DEFAULT_ERA_OFFSET;
use serde::Deserialize;

use crate::fetch::FetchSettings;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub pool: PoolConfig,
    pub browser: BrowserSettings,
    pub portal: PortalConfig,
    pub fetch: FetchSettings,
    pub output: OutputOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_sessions: usize,
    /// Borrowers allowed to queue for a session before `acquire` fails fast.
    pub max_waiting: usize,
    #[serde(with = "millis")]
    pub idle_timeout: Duration,
    #[serde(with = "millis")]
    pub eviction_interval: Duration,
}

/// Upper bound on concurrent sessions, whatever the config file asks for.
pub const MAX_SESSIONS: usize = 4096;

impl PoolConfig {
    /// `max_sessions` clamped to `1..=MAX_SESSIONS`.
    pub fn session_limit(&self) -> usize {
        self.max_sessions.clamp(1, MAX_SESSIONS)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions: 8,
            max_waiting: 600,
            idle_timeout: Duration::from_secs(10 * 60),
            eviction_interval: Duration::from_secs(3 * 60),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub ignore_certificate_errors: bool,
    #[serde(with = "millis")]
    pub navigation_timeout: Duration,
    /// Requests to any other host are aborted.
    pub allowed_host: String,
    /// CDP resource types (`Image`, `Stylesheet`, ...) that are never loaded.
    pub blocked_resource_types: Vec<String>,
    pub executable: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            ignore_certificate_errors: true,
            navigation_timeout: Duration::from_secs(10),
            allowed_host: "law.judicial.gov.tw".to_string(),
            blocked_resource_types: vec![
                "Image".to_string(),
                "Stylesheet".to_string(),
                "Font".to_string(),
            ],
            executable: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub entry_url: String,
    /// Value of the court option selected in the search form.
    pub court: String,
    pub era_offset: i32,
    /// Path fragment identifying the results-listing frame.
    pub results_frame_fragment: String,
    /// Listing links without this fragment cannot be resolved and are dropped.
    pub resolvable_link_fragment: String,
    /// Fragment every ruling page URL carries.
    pub document_fragment: String,
    #[serde(with = "millis")]
    pub link_read_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            entry_url: "https://law.judicial.gov.tw/FJUD/Default_AD.aspx".to_string(),
            court: "TPS".to_string(),
            era_offset: DEFAULT_ERA_OFFSET,
            results_frame_fragment: "qryresultlst.aspx".to_string(),
            resolvable_link_fragment: "FJUD/data.aspx".to_string(),
            document_fragment: "data.aspx".to_string(),
            link_read_timeout: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub write_text: bool,
    pub download_export: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            write_text: true,
            download_export: true,
        }
    }
}

/// Durations as whole milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_limits() {
        let config = CrawlConfig::default();
        assert_eq!(config.pool.max_sessions, 8);
        assert_eq!(config.pool.max_waiting, 600);
        assert_eq!(config.pool.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.pool.eviction_interval, Duration::from_secs(180));
        assert_eq!(config.browser.navigation_timeout, Duration::from_secs(10));
        assert_eq!(config.portal.link_read_timeout, Duration::from_millis(300));
        assert_eq!(config.portal.era_offset, 1911);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: CrawlConfig =
            serde_json::from_str(r#"{"pool": {"max_sessions": 2, "idle_timeout": 1500}}"#).unwrap();
        assert_eq!(config.pool.max_sessions, 2);
        assert_eq!(config.pool.idle_timeout, Duration::from_millis(1500));
        assert_eq!(config.pool.max_waiting, 600);
        assert_eq!(config.portal, PortalConfig::default());
    }

    #[test]
    fn session_limit_is_clamped() {
        let mut pool = PoolConfig::default();
        assert_eq!(pool.session_limit(), 8);
        pool.max_sessions = 0;
        assert_eq!(pool.session_limit(), 1);
        pool.max_sessions = usize::MAX;
        assert_eq!(pool.session_limit(), MAX_SESSIONS);
    }
}
