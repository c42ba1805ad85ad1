use matchweek::config::{IdentityProfile, UserAgentConfig};
use matchweek::fetch::{
    build_http_client, DirectTransport, DiskCache, ErrorClass, FailureKind, FetchEngine,
    FetchOutcome, ManualClock, RequestThrottle, ResourceRequest, RobotsGate, ScrapeApiTransport,
    ServedFrom, Transport,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCHEDULE_PATH: &str = "/en/comps/9/schedule/Premier-League-Scores-and-Fixtures";
const PAGE: &str = "<html><h1>2025-2026 Premier League Scores &amp; Fixtures</h1></html>";

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        profile: IdentityProfile::Crawler,
        crawler_name: "TestCollector".to_string(),
        crawler_version: "1.0".to_string(),
        contact_url: "https://example.com/about".to_string(),
        contact_email: "admin@example.com".to_string(),
    }
}

fn client(timeout: Duration) -> reqwest::Client {
    build_http_client(&user_agent(), timeout).unwrap()
}

fn direct_engine(cache_dir: &TempDir, clock: &ManualClock, timeout: Duration) -> FetchEngine {
    FetchEngine::new(
        Box::new(DirectTransport::new(client(timeout))),
        Box::new(DiskCache::new(cache_dir.path())),
        RequestThrottle::new(10, Duration::from_secs(60), Duration::from_millis(500)),
        Arc::new(clock.clone()),
    )
}

fn request(server: &MockServer) -> ResourceRequest {
    ResourceRequest::new(format!("{}{}", server.uri(), SCHEDULE_PATH), "Premier League")
        .with_max_attempts(3)
        .with_backoff_base(Duration::from_secs(1))
}

#[tokio::test]
async fn test_direct_transport_returns_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/teapot"))
        .respond_with(ResponseTemplate::new(418).set_body_string("short and stout"))
        .mount(&mock_server)
        .await;

    let transport = DirectTransport::new(client(Duration::from_secs(5)));
    let response = transport
        .get(&format!("{}/teapot", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status, 418);
    assert_eq!(response.body, "short and stout");
}

#[tokio::test]
async fn test_direct_transport_sends_crawler_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestCollector/1.0 (+https://example.com/about; admin@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = DirectTransport::new(client(Duration::from_secs(5)));
    let response = transport.get(&format!("{}/", mock_server.uri())).await.unwrap();

    // Unmatched requests get a 404 from the mock server
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_scrape_api_transport_forwards_key_and_target() {
    let mock_server = MockServer::start().await;
    let target = "https://fbref.com/en/comps/9/schedule/Premier-League-Scores-and-Fixtures";

    Mock::given(method("GET"))
        .and(path("/v1/"))
        .and(query_param("api_key", "secret-key"))
        .and(query_param("url", target))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = ScrapeApiTransport::new(
        client(Duration::from_secs(5)),
        &format!("{}/v1/", mock_server.uri()),
        Some("secret-key\n".to_string()),
        "SCRAPE_KEY",
    )
    .unwrap();

    let response = transport.get(target).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, PAGE);
}

#[tokio::test]
async fn test_engine_retries_rate_limit_then_caches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new();
    let mut engine = direct_engine(&temp, &clock, Duration::from_secs(5));

    let outcome = engine.fetch(&request(&mock_server)).await;

    assert_eq!(
        outcome,
        FetchOutcome::Success {
            content: PAGE.to_string(),
            served_from: ServedFrom::Network,
            attempts: 3,
        }
    );
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);

    // A second engine on the same cache directory never reaches the server
    let mut second = direct_engine(&temp, &ManualClock::new(), Duration::from_secs(5));
    let cached = second.fetch(&request(&mock_server)).await;

    assert_eq!(
        cached,
        FetchOutcome::Success {
            content: PAGE.to_string(),
            served_from: ServedFrom::Cache,
            attempts: 0,
        }
    );
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
    assert!(second.throttle().is_empty());
}

#[tokio::test]
async fn test_engine_rejects_challenge_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<title>Just a moment...</title>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new();
    let mut engine = direct_engine(&temp, &clock, Duration::from_secs(5));

    let outcome = engine.fetch(&request(&mock_server)).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(std::fs::read_dir(temp.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn test_engine_timeouts_exhaust_as_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new();
    let mut engine = direct_engine(&temp, &clock, Duration::from_millis(200));

    let outcome = engine
        .fetch(&request(&mock_server).with_max_attempts(2))
        .await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure {
            kind: FailureKind::Exhausted {
                last: ErrorClass::TransientNetwork
            },
            attempts: 2,
        }
    );
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
    assert_eq!(engine.throttle().len(), 2);
}

#[tokio::test]
async fn test_engine_honors_robots_disallow() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: TestCollector\nDisallow: /en/"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new();
    let mut engine = direct_engine(&temp, &clock, Duration::from_secs(5))
        .with_robots(RobotsGate::new("TestCollector"));

    // The second fetch reuses the stored rules
    for _ in 0..2 {
        let outcome = engine.fetch(&request(&mock_server)).await;
        assert_eq!(
            outcome,
            FetchOutcome::Failure {
                kind: FailureKind::Disallowed,
                attempts: 0,
            }
        );
    }
}
