//! robots.txt compliance
//!
//! The gate remembers the robots.txt of every origin it has seen for 24 hours.
//! Fetching the file is left to the engine so it goes through the same
//! throttle and transport as every other request.

use chrono::{DateTime, Duration, Utc};
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use url::Url;

/// Cached robots.txt rules for one origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// Raw robots.txt content (empty means allow all)
    pub content: String,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: String) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Rules older than 24 hours must be fetched again
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}

/// Per-origin robots.txt decisions
#[derive(Debug, Clone)]
pub struct RobotsGate {
    /// Product token matched against `User-agent` lines
    user_agent: String,
    rules: HashMap<String, CachedRobots>,
}

impl RobotsGate {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            rules: HashMap::new(),
        }
    }

    /// The robots.txt URL serving `url`, or `None` for URLs without an origin
    pub fn robots_url(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        if !parsed.has_host() {
            return None;
        }
        parsed.join("/robots.txt").ok().map(|u| u.to_string())
    }

    /// Whether the rules for `url`'s origin are unknown or stale
    pub fn needs_fetch(&self, url: &str) -> bool {
        match origin_of(url) {
            Some(origin) => self.rules.get(&origin).map_or(true, CachedRobots::is_stale),
            None => false,
        }
    }

    /// Stores the robots.txt body for `url`'s origin
    ///
    /// `None` means the file could not be fetched, which allows everything.
    pub fn store(&mut self, url: &str, content: Option<String>) {
        if let Some(origin) = origin_of(url) {
            self.rules
                .insert(origin, CachedRobots::new(content.unwrap_or_default()));
        }
    }

    /// Checks `url` against the stored rules; unknown origins are allowed
    pub fn is_allowed(&self, url: &str) -> bool {
        origin_of(url)
            .and_then(|origin| self.rules.get(&origin))
            .map_or(true, |rules| rules.is_allowed(url, &self.user_agent))
    }

    #[cfg(test)]
    fn age_rules(&mut self, url: &str, by: Duration) {
        if let Some(rules) = origin_of(url).and_then(|o| self.rules.get_mut(&o)) {
            rules.fetched_at = rules.fetched_at - by;
        }
    }
}

/// `scheme://host[:port]` of a URL
fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}
