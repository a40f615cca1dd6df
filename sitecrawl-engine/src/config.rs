use crate::error::{CrawlError, Result};
use crate::normalize::PrefixOverrides;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "sitecrawl/0.1 (+https://github.com/sitecrawl/sitecrawl)";

/// Per-run crawl scope and pacing.
///
/// Loaded from JSON or built in code with the `with_*` methods. Missing
/// fields in a config file fall back to [`CrawlerConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Deepest link distance from the seed that is still fetched.
    pub max_depth: usize,
    /// Upper bound on URLs handed to the visitor in one batch.
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Scope prefix; derived from the seed when absent.
    pub url_prefix: Option<String>,
    /// Regex that discovered URLs must contain a match for.
    pub filter_pattern: Option<String>,
    /// Maximum number of pages yielded. `None` is unbounded; a config file
    /// may also say `-1` (any negative number) for unbounded.
    #[serde(deserialize_with = "deserialize_limit")]
    pub limit: Option<usize>,
    pub user_agent: String,
    pub prefix_overrides: PrefixOverrides,
}

fn deserialize_limit<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|limit| usize::try_from(limit).ok()))
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            concurrency: 3,
            timeout_secs: 60,
            url_prefix: None,
            filter_pattern: None,
            limit: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            prefix_overrides: PrefixOverrides::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    pub fn with_filter_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.filter_pattern = Some(pattern.into());
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_prefix_overrides(mut self, overrides: PrefixOverrides) -> Self {
        self.prefix_overrides = overrides;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Compile the filter pattern, if any.
    pub fn compiled_pattern(&self) -> Result<Option<Regex>> {
        self.filter_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(CrawlError::from)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(CrawlError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(CrawlError::InvalidConfig(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        self.compiled_pattern()?;
        Ok(())
    }
}
