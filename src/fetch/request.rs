//! Fetch requests and their outcomes

use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Derives the cache key for a URL: lowercase hex SHA-256 of its bytes
///
/// # Example
///
/// ```
/// use matchweek::fetch::cache_key;
///
/// let a = cache_key("https://fbref.com/en/comps/9/schedule");
/// assert_eq!(a, cache_key("https://fbref.com/en/comps/9/schedule"));
/// assert_eq!(a.len(), 64);
/// ```
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// One logical fetch with its retry and freshness policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    url: String,
    cache_key: String,

    /// Cached payloads older than this are ignored; zero skips the cache
    pub max_age: Duration,

    /// Network attempts before giving up
    pub max_attempts: u32,

    /// First retry delay; doubled after every retry
    pub backoff_base: Duration,

    /// Token a genuine payload must contain
    pub marker: String,
}

impl ResourceRequest {
    /// Creates a request with one hour of cache reuse, 3 attempts and 1s backoff
    ///
    /// Only payloads containing `marker` count as a successful fetch.
    pub fn new(url: impl Into<String>, marker: impl Into<String>) -> Self {
        let url = url.into();
        let cache_key = cache_key(&url);
        Self {
            url,
            cache_key,
            max_age: Duration::from_secs(3600),
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            marker: marker.into(),
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Content-sanity check: non-empty and carrying the marker
    pub fn accepts(&self, body: &str) -> bool {
        !body.trim().is_empty() && body.contains(self.marker.as_str())
    }
}

/// Where a successful payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
}

impl fmt::Display for ServedFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Classification of a failed attempt or run stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Timeout, DNS failure, connection reset
    TransientNetwork,
    /// HTTP 403 or 429
    PolicyBlocked,
    /// HTTP 5xx
    RemoteServerError,
    /// Any other status, or a 200 failing the sanity check
    DefinitiveRejection,
    /// A required credential is absent
    ConfigurationMissing,
    /// Extraction found nothing to do
    NoData,
    /// The external scorer failed
    CollaboratorFailure,
}

impl ErrorClass {
    /// Classifies an HTTP status that is not an accepted 200
    pub fn from_status(status: u16) -> Self {
        match status {
            403 | 429 => Self::PolicyBlocked,
            500..=599 => Self::RemoteServerError,
            _ => Self::DefinitiveRejection,
        }
    }

    /// Whether the fetch loop retries after this class
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork | Self::PolicyBlocked | Self::RemoteServerError
        )
    }
}

/// Why a response was refused without retrying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Status outside the retryable set
    Status(u16),
    /// Status was fine but the payload is not the intended page
    MissingMarker { status: u16 },
}

/// Why a fetch produced no content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The transport needs a credential that is not set
    MissingCredential { variable: String },
    /// Every attempt failed with a retryable class
    Exhausted { last: ErrorClass },
    /// A definitive answer that retrying would not change
    Rejected(Rejection),
    /// robots.txt forbids the URL
    Disallowed,
}

impl FailureKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingCredential { .. } => ErrorClass::ConfigurationMissing,
            Self::Exhausted { last } => *last,
            Self::Rejected(_) | Self::Disallowed => ErrorClass::DefinitiveRejection,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential { variable } => {
                write!(f, "missing credential ({} not set)", variable)
            }
            Self::Exhausted { last } => write!(f, "attempts exhausted (last: {:?})", last),
            Self::Rejected(Rejection::Status(status)) => {
                write!(f, "unretryable status {}", status)
            }
            Self::Rejected(Rejection::MissingMarker { status }) => {
                write!(f, "status {} but payload failed the content check", status)
            }
            Self::Disallowed => write!(f, "disallowed by robots.txt"),
        }
    }
}

/// Result of one `FetchEngine::fetch` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success {
        content: String,
        served_from: ServedFrom,
        /// Network attempts made (0 for a cache hit)
        attempts: u32,
    },
    Failure {
        kind: FailureKind,
        attempts: u32,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The payload, if the fetch succeeded
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Success { content, .. } => Some(content),
            Self::Failure { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }
}
