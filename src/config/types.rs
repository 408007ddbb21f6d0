use serde::Deserialize;

/// Default visited-count ceiling per site
pub const DEFAULT_MAX_PAGES_PER_SITE: u32 = 1000;

/// Default number of concurrent fetches within one site
pub const DEFAULT_MAX_CONCURRENT_FETCHES: u32 = 8;

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for Site-Indexer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of URLs claimed per site in one run (0 disables the ceiling)
    #[serde(rename = "max-pages-per-site", default = "default_max_pages_per_site")]
    pub max_pages_per_site: u32,

    /// Number of sites crawled in parallel; defaults to the number of configured sites
    #[serde(rename = "max-concurrent-sites", default)]
    pub max_concurrent_sites: Option<u32>,

    /// Number of in-flight fetches within one site
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: u32,

    /// Per-request timeout (seconds)
    #[serde(
        rename = "request-timeout-secs",
        default = "default_request_timeout_secs"
    )]
    pub request_timeout_secs: u64,
}

impl CrawlerConfig {
    /// The visited-count ceiling, or `None` when unlimited
    pub fn page_ceiling(&self) -> Option<usize> {
        match self.max_pages_per_site {
            0 => None,
            n => Some(n as usize),
        }
    }

    /// Size of the outer worker pool for `site_count` configured sites
    pub fn site_pool_size(&self, site_count: usize) -> usize {
        self.max_concurrent_sites
            .map(|n| n as usize)
            .unwrap_or(site_count)
            .max(1)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages_per_site: DEFAULT_MAX_PAGES_PER_SITE,
            max_concurrent_sites: None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_max_pages_per_site() -> u32 {
    DEFAULT_MAX_PAGES_PER_SITE
}

fn default_max_concurrent_fetches() -> u32 {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One configured web site
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the site; only URLs under it are crawled
    pub url: String,

    /// Human-readable site name
    pub name: String,
}

impl SiteConfig {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}
