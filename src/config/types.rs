use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Matchweek
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(rename = "scrape-api", default)]
    pub scrape_api: ScrapeApiConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The listing page to fetch
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// URL of the fixtures listing page
    pub url: String,

    /// Token that must appear in a genuine copy of the page
    #[serde(rename = "expected-marker", default = "default_expected_marker")]
    pub expected_marker: String,
}

/// Which transport carries the requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Plain GET against the source host
    Direct,
    /// GET through a third-party scraping proxy API
    ScrapeApi,
}

/// Retry, backoff and cache freshness settings
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_transport")]
    pub transport: TransportKind,

    /// Maximum network attempts for one logical fetch
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay (milliseconds), doubled after each retry
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Reuse cached pages younger than this (seconds)
    #[serde(rename = "cache-max-age-secs", default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Check robots.txt before fetching
    #[serde(rename = "respect-robots", default)]
    pub respect_robots: bool,
}

impl FetchConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            cache_max_age_secs: default_cache_max_age_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            respect_robots: false,
        }
    }
}

/// Rolling-window request cap
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum requests inside any trailing window
    #[serde(rename = "max-requests", default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length (seconds)
    #[serde(rename = "window-secs", default = "default_window_secs")]
    pub window_secs: u64,

    /// Extra margin added to every throttle sleep (milliseconds)
    #[serde(rename = "guard-ms", default = "default_guard_ms")]
    pub guard_ms: u64,
}

impl ThrottleConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn guard(&self) -> Duration {
        Duration::from_millis(self.guard_ms)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            guard_ms: default_guard_ms(),
        }
    }
}

/// Cache storage medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheBackend {
    /// One file per cache key under a directory
    Disk,
    /// One row per cache key in a SQLite database
    Sqlite,
}

/// Response cache location
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// Directory (disk backend) or database file (sqlite backend)
    #[serde(default = "default_cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: default_cache_path(),
        }
    }
}

/// Header set presented to the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityProfile {
    /// Self-identifying crawler user agent with contact details
    Crawler,
    /// Desktop browser user agent and accept headers
    Browser,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_profile")]
    pub profile: IdentityProfile,

    /// Name of the collector
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the collector
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the collector
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for collector-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Scraping proxy settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeApiConfig {
    #[serde(default = "default_scrape_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key
    #[serde(rename = "key-env", default = "default_key_env")]
    pub key_env: String,
}

impl Default for ScrapeApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_scrape_endpoint(),
            key_env: default_key_env(),
        }
    }
}

/// Where the fixtures table lives inside the listing page
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(rename = "container-id-prefix", default = "default_container_prefix")]
    pub container_id_prefix: String,

    #[serde(rename = "container-id-contains", default = "default_container_contains")]
    pub container_id_contains: String,

    /// `data-stat` of the matchweek cell
    #[serde(rename = "period-stat", default = "default_period_stat")]
    pub period_stat: String,

    /// `data-stat` of the score cell
    #[serde(rename = "result-stat", default = "default_result_stat")]
    pub result_stat: String,

    /// Anchor text of the detail link
    #[serde(rename = "link-text", default = "default_link_text")]
    pub link_text: String,

    /// Base URL for resolving detail links
    #[serde(rename = "link-base", default = "default_link_base")]
    pub link_base: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            container_id_prefix: default_container_prefix(),
            container_id_contains: default_container_contains(),
            period_stat: default_period_stat(),
            result_stat: default_result_stat(),
            link_text: default_link_text(),
            link_base: default_link_base(),
        }
    }
}

/// What a failing scorer invocation does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the run, no merge
    Abort,
    /// Log, drop the item and keep going
    Skip,
}

/// External scorer invocation
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before `<link> <destination>`
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(rename = "working-dir", default = "default_working_dir")]
    pub working_dir: String,

    /// Directory receiving the per-match files
    #[serde(rename = "output-dir", default = "default_scorer_output_dir")]
    pub output_dir: String,

    #[serde(rename = "on-failure", default = "default_failure_policy")]
    pub on_failure: FailurePolicy,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            working_dir: default_working_dir(),
            output_dir: default_scorer_output_dir(),
            on_failure: default_failure_policy(),
        }
    }
}

/// Weekly artifact location
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: String,

    #[serde(rename = "file-prefix", default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_expected_marker() -> String {
    "Premier League".to_string()
}

fn default_transport() -> TransportKind {
    TransportKind::ScrapeApi
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_cache_max_age_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_requests() -> usize {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_guard_ms() -> u64 {
    500
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Disk
}

fn default_cache_path() -> String {
    "fbref_cache".to_string()
}

fn default_profile() -> IdentityProfile {
    IdentityProfile::Crawler
}

fn default_scrape_endpoint() -> String {
    "https://scrape.abstractapi.com/v1/".to_string()
}

fn default_key_env() -> String {
    "ABSTRACTAPI_KEY".to_string()
}

fn default_container_prefix() -> String {
    "div_sched_".to_string()
}

fn default_container_contains() -> String {
    "_9_".to_string()
}

fn default_period_stat() -> String {
    "week".to_string()
}

fn default_result_stat() -> String {
    "score".to_string()
}

fn default_link_text() -> String {
    "Match Report".to_string()
}

fn default_link_base() -> String {
    "https://fbref.com".to_string()
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_args() -> Vec<String> {
    vec!["scoring.py".to_string()]
}

fn default_working_dir() -> String {
    "HFW-App".to_string()
}

fn default_scorer_output_dir() -> String {
    "weekly_scores".to_string()
}

fn default_failure_policy() -> FailurePolicy {
    FailurePolicy::Abort
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_file_prefix() -> String {
    "Matchweek_".to_string()
}
