//! Fetch layer
//!
//! Turns a [`ResourceRequest`] into a [`FetchOutcome`]:
//! - Fresh cached payloads are served without touching the network
//! - Every network request passes the rolling-window [`RequestThrottle`]
//! - Retryable failures back off exponentially, definitive ones fail fast
//! - Only payloads passing the content check are cached

mod cache;
mod clock;
mod engine;
mod request;
mod robots;
mod sqlite_cache;
mod throttle;
mod transport;

pub use cache::{CacheError, CacheResult, DiskCache, ResponseCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::FetchEngine;
pub use request::{
    cache_key, ErrorClass, FailureKind, FetchOutcome, Rejection, ResourceRequest, ServedFrom,
};
pub use robots::{CachedRobots, RobotsGate};
pub use sqlite_cache::SqliteCache;
pub use throttle::RequestThrottle;
pub use transport::{
    build_http_client, build_transport, crawler_user_agent, DirectTransport, ScrapeApiTransport,
    Transport, TransportError, TransportResponse,
};

use crate::config::{CacheBackend, CacheConfig, Config};
use crate::MatchweekError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Opens the configured cache backend
pub fn open_cache(config: &CacheConfig) -> CacheResult<Box<dyn ResponseCache + Send>> {
    let path = Path::new(&config.path);
    let cache: Box<dyn ResponseCache + Send> = match config.backend {
        CacheBackend::Disk => Box::new(DiskCache::new(path)),
        CacheBackend::Sqlite => Box::new(SqliteCache::new(path)?),
    };
    tracing::debug!(backend = ?config.backend, path = %path.display(), "Cache ready");
    Ok(cache)
}

/// Builds the request for the configured listing page
///
/// With `bypass_cache` the maximum age is zero, so any cached copy is stale.
pub fn source_request(config: &Config, bypass_cache: bool) -> ResourceRequest {
    let max_age = if bypass_cache {
        Duration::ZERO
    } else {
        config.fetch.cache_max_age()
    };

    ResourceRequest::new(&config.source.url, &config.source.expected_marker)
        .with_max_age(max_age)
        .with_max_attempts(config.fetch.max_attempts)
        .with_backoff_base(config.fetch.backoff_base())
}

impl FetchEngine {
    /// Builds the engine described by `config` on the system clock
    pub fn from_config(config: &Config) -> Result<Self, MatchweekError> {
        let transport = build_transport(config)?;
        let cache = open_cache(&config.cache)?;
        let throttle = RequestThrottle::new(
            config.throttle.max_requests,
            config.throttle.window(),
            config.throttle.guard(),
        );

        let engine = Self::new(transport, cache, throttle, Arc::new(SystemClock));
        if config.fetch.respect_robots {
            return Ok(engine.with_robots(RobotsGate::new(&config.user_agent.crawler_name)));
        }
        Ok(engine)
    }
}
