//! Fetch engine: cache, throttle, retry and transport in one call
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Fresh cache entry | Return it, no request |
//! | Missing credential | Fail immediately |
//! | Timeout / connection error | Retry with backoff |
//! | HTTP 200 + marker | Cache and return |
//! | HTTP 200 without marker | Fail immediately (challenge page) |
//! | HTTP 403 / 429 | Retry with backoff |
//! | HTTP 5xx | Retry with backoff |
//! | Anything else | Fail immediately |
//!
//! Backoff starts at the request's base and doubles after every retry.

use crate::fetch::cache::ResponseCache;
use crate::fetch::clock::Clock;
use crate::fetch::request::{
    ErrorClass, FailureKind, FetchOutcome, Rejection, ResourceRequest, ServedFrom,
};
use crate::fetch::robots::RobotsGate;
use crate::fetch::throttle::RequestThrottle;
use crate::fetch::transport::{Transport, TransportError, TransportResponse};
use std::sync::Arc;

/// Orchestrates one logical fetch at a time
pub struct FetchEngine {
    transport: Box<dyn Transport>,
    cache: Box<dyn ResponseCache + Send>,
    throttle: RequestThrottle,
    clock: Arc<dyn Clock>,
    robots: Option<RobotsGate>,
}

impl FetchEngine {
    /// Creates an engine owning the given throttle
    pub fn new(
        transport: Box<dyn Transport>,
        cache: Box<dyn ResponseCache + Send>,
        throttle: RequestThrottle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            cache,
            throttle,
            clock,
            robots: None,
        }
    }

    /// Enables robots.txt checks before network fetches
    #[must_use]
    pub fn with_robots(mut self, gate: RobotsGate) -> Self {
        self.robots = Some(gate);
        self
    }

    pub fn throttle(&self) -> &RequestThrottle {
        &self.throttle
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Fetches `request`, from cache when fresh, otherwise over the transport
    ///
    /// Never returns an error: every failure is folded into
    /// [`FetchOutcome::Failure`] so the caller can decide how to end the run.
    pub async fn fetch(&mut self, request: &ResourceRequest) -> FetchOutcome {
        let url = request.url();

        // A zero max age means "always refetch", whatever the entry's age
        if request.max_age.is_zero() {
            tracing::debug!(url, "Cache bypassed");
        } else {
            match self.cache.get(request.cache_key(), request.max_age) {
                Ok(Some(content)) => {
                    return FetchOutcome::Success {
                        content,
                        served_from: ServedFrom::Cache,
                        attempts: 0,
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(url, error = %e, "Cache read failed, treating as a miss");
                }
            }
        }

        if let Some(variable) = self.transport.missing_credential() {
            tracing::warn!(
                transport = self.transport.name(),
                variable,
                "Required credential is not set, not fetching"
            );
            return FetchOutcome::Failure {
                kind: FailureKind::MissingCredential {
                    variable: variable.to_string(),
                },
                attempts: 0,
            };
        }

        if self.robots.is_some() && !self.robots_allow(url).await {
            tracing::warn!(url, "URL disallowed by robots.txt");
            return FetchOutcome::Failure {
                kind: FailureKind::Disallowed,
                attempts: 0,
            };
        }

        self.fetch_from_network(request).await
    }

    /// The attempt loop; only reached on a cache miss
    async fn fetch_from_network(&mut self, request: &ResourceRequest) -> FetchOutcome {
        let url = request.url();
        let max_attempts = request.max_attempts.max(1);
        let mut backoff = request.backoff_base;
        let mut last = ErrorClass::TransientNetwork;

        for attempt in 1..=max_attempts {
            tracing::info!(
                url,
                attempt,
                max_attempts,
                transport = self.transport.name(),
                "Fetching"
            );

            let result = match self.round_trip(url).await {
                Err(TransportError::MissingCredential { variable }) => {
                    return FetchOutcome::Failure {
                        kind: FailureKind::MissingCredential { variable },
                        attempts: attempt - 1,
                    };
                }
                other => other,
            };

            let class = match result {
                Err(e) => {
                    tracing::warn!(url, error = %e, "Network error");
                    ErrorClass::TransientNetwork
                }
                Ok(TransportResponse { status, body }) => {
                    tracing::info!(url, status, bytes = body.len(), "Response received");

                    if status == 200 {
                        if request.accepts(&body) {
                            self.store(request, &body);
                            return FetchOutcome::Success {
                                content: body,
                                served_from: ServedFrom::Network,
                                attempts: attempt,
                            };
                        }

                        tracing::warn!(
                            url,
                            marker = %request.marker,
                            "Payload failed the content check, likely a challenge page"
                        );
                        return FetchOutcome::Failure {
                            kind: FailureKind::Rejected(Rejection::MissingMarker { status }),
                            attempts: attempt,
                        };
                    }

                    let class = ErrorClass::from_status(status);
                    if !class.is_retryable() {
                        tracing::warn!(url, status, "Unexpected status, not retrying");
                        return FetchOutcome::Failure {
                            kind: FailureKind::Rejected(Rejection::Status(status)),
                            attempts: attempt,
                        };
                    }
                    class
                }
            };

            last = class;

            if attempt < max_attempts {
                tracing::warn!(
                    url,
                    class = ?class,
                    backoff_secs = backoff.as_secs_f64(),
                    "Retryable failure, backing off"
                );
                self.clock.sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }

        tracing::warn!(url, max_attempts, last = ?last, "Giving up after max attempts");
        FetchOutcome::Failure {
            kind: FailureKind::Exhausted { last },
            attempts: max_attempts,
        }
    }

    /// One throttled request; every request that reaches the wire is recorded
    async fn round_trip(&mut self, url: &str) -> Result<TransportResponse, TransportError> {
        self.throttle.wait_if_needed(self.clock.as_ref()).await;

        let result = self.transport.get(url).await;
        if !matches!(result, Err(TransportError::MissingCredential { .. })) {
            self.throttle.record(self.clock.now());
        }
        result
    }

    /// Writes a fresh payload to the cache; failures only cost the next run a fetch
    fn store(&mut self, request: &ResourceRequest, body: &str) {
        match self.cache.put(request.cache_key(), body) {
            Ok(()) => tracing::info!(url = request.url(), "Saved fetched page to cache"),
            Err(e) => {
                tracing::warn!(url = request.url(), error = %e, "Could not write cache entry")
            }
        }
    }

    /// Loads robots.txt for the origin if needed and checks `url` against it
    async fn robots_allow(&mut self, url: &str) -> bool {
        let needs_fetch = self.robots.as_ref().is_some_and(|g| g.needs_fetch(url));

        if needs_fetch {
            if let Some(robots_url) = RobotsGate::robots_url(url) {
                tracing::debug!(robots_url, "Fetching robots.txt");
                let content = match self.round_trip(&robots_url).await {
                    Ok(TransportResponse { status: 200, body }) => Some(body),
                    Ok(TransportResponse { status, .. }) => {
                        tracing::debug!(robots_url, status, "No usable robots.txt, allowing all");
                        None
                    }
                    Err(e) => {
                        tracing::debug!(robots_url, error = %e, "robots.txt fetch failed, allowing all");
                        None
                    }
                };
                if let Some(gate) = self.robots.as_mut() {
                    gate.store(url, content);
                }
            }
        }

        self.robots.as_ref().map_or(true, |g| g.is_allowed(url))
    }
}
