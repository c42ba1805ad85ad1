//! HTTP transports
//!
//! Every way of getting a page (plain GET, GET through a scraping proxy) is a
//! [`Transport`]. The fetch engine only ever sees this trait, and the concrete
//! transport is picked from configuration.

use crate::config::{Config, IdentityProfile, TransportKind, UserAgentConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// User agent sent by the `browser` identity profile
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Errors raised by a transport before an HTTP status is available
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Missing credential: environment variable {variable} is not set")]
    MissingCredential { variable: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Status and body of one completed round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Capability: GET a URL under a configured identity, return status + body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Name of a required credential that is not set, if any
    fn missing_credential(&self) -> Option<&str> {
        None
    }

    /// Performs one GET round trip
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// Formats the self-identifying user agent
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn crawler_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client presenting the configured identity profile
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    let user_agent = match config.profile {
        IdentityProfile::Crawler => crawler_user_agent(config),
        IdentityProfile::Browser => {
            headers.insert(
                ACCEPT,
                HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
            );
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
            BROWSER_USER_AGENT.to_string()
        }
    };

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the transport selected in `config`
///
/// The scrape-api credential is read from the environment here, but its
/// absence is only reported when a fetch actually needs it.
pub fn build_transport(config: &Config) -> Result<Box<dyn Transport>, TransportError> {
    let client = build_http_client(&config.user_agent, config.fetch.request_timeout())?;

    let transport: Box<dyn Transport> = match config.fetch.transport {
        TransportKind::Direct => Box::new(DirectTransport::new(client)),
        TransportKind::ScrapeApi => Box::new(ScrapeApiTransport::from_env(
            client,
            &config.scrape_api.endpoint,
            &config.scrape_api.key_env,
        )?),
    };

    tracing::debug!(transport = transport.name(), "Transport ready");
    Ok(transport)
}

/// Plain GET against the target host
#[derive(Debug, Clone)]
pub struct DirectTransport {
    client: Client,
}

impl DirectTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        send(self.client.get(url), url).await
    }
}

/// GET through a scraping proxy: `<endpoint>?api_key=<key>&url=<target>`
#[derive(Debug, Clone)]
pub struct ScrapeApiTransport {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    key_env: String,
}

impl ScrapeApiTransport {
    /// Creates a proxy transport with an explicit key
    ///
    /// A blank key is treated as absent.
    pub fn new(
        client: Client,
        endpoint: &str,
        api_key: Option<String>,
        key_env: impl Into<String>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            api_key: api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            key_env: key_env.into(),
        })
    }

    /// Creates a proxy transport reading its key from `key_env`
    pub fn from_env(client: Client, endpoint: &str, key_env: &str) -> Result<Self, TransportError> {
        Self::new(client, endpoint, std::env::var(key_env).ok(), key_env)
    }

    fn credential_error(&self) -> TransportError {
        TransportError::MissingCredential {
            variable: self.key_env.clone(),
        }
    }
}

#[async_trait]
impl Transport for ScrapeApiTransport {
    fn name(&self) -> &'static str {
        "scrape-api"
    }

    fn missing_credential(&self) -> Option<&str> {
        match self.api_key {
            Some(_) => None,
            None => Some(&self.key_env),
        }
    }

    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let key = self.api_key.as_deref().ok_or_else(|| self.credential_error())?;

        let request = self
            .client
            .get(self.endpoint.clone())
            .query(&[("api_key", key), ("url", url)]);

        send(request, url).await
    }
}

/// Sends a request and reads the body, classifying wire failures
async fn send(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<TransportResponse, TransportError> {
    let response = request.send().await.map_err(|e| classify(e, url))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| classify(e, url))?;

    Ok(TransportResponse { status, body })
}

/// Maps a reqwest error onto the transport taxonomy
fn classify(error: reqwest::Error, url: &str) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
