use matchweek::config::parse_config;
use matchweek::fetch::{FailureKind, ServedFrom};
use matchweek::run::AbortReason;
use matchweek::{RunCoordinator, RunState};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCHEDULE_PATH: &str = "/en/comps/9/schedule/Premier-League-Scores-and-Fixtures";

/// Writes `link,rating` plus one row per call to the destination
const SCORER_SCRIPT: &str = r#"echo "link,rating" > "$2"; echo "$1,7.0" >> "$2""#;

/// Creates a test configuration against the mock server
fn create_test_config(server: &MockServer, temp: &Path, transport: &str, key_env: &str) -> String {
    format!(
        r#"
[source]
url = "{uri}{schedule}"
expected-marker = "Premier League"

[fetch]
transport = "{transport}"
max-attempts = 2
backoff-base-ms = 10
request-timeout-secs = 5

[throttle]
max-requests = 10
window-secs = 60
guard-ms = 0

[cache]
path = '{dir}/cache'

[user-agent]
crawler-name = "TestCollector"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[scrape-api]
endpoint = "{uri}/v1/"
key-env = "{key_env}"

[schedule]
link-base = "{uri}"

[scorer]
program = "sh"
args = ["-c", '{script}', "scorer"]
working-dir = '{dir}'
output-dir = '{dir}/weekly_scores'

[output]
directory = '{dir}/out'
"#,
        uri = server.uri(),
        schedule = SCHEDULE_PATH,
        transport = transport,
        key_env = key_env,
        dir = temp.display(),
        script = SCORER_SCRIPT,
    )
}

fn schedule_page(rows: &[(u32, &str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(week, score, slug)| {
            format!(
                r#"<tr><th data-stat="gameweek">{week}</th><td data-stat="week">{week}</td><td data-stat="score">{score}</td><td data-stat="match_report"><a href="/en/matches/{slug}">Match Report</a></td></tr>"#,
            )
        })
        .collect();
    format!(
        r#"<html><body><h1>2025-2026 Premier League Scores &amp; Fixtures</h1>
        <div id="div_sched_2025-2026_9_1"><table>
        <thead><tr><th data-stat="week">Wk</th><th data-stat="score">Score</th></tr></thead>
        <tbody>{}</tbody></table></div></body></html>"#,
        body
    )
}

async fn mount_schedule(server: &MockServer, page: String) {
    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(server)
        .await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_full_pipeline_single_week() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    mount_schedule(
        &mock_server,
        schedule_page(&[
            (7, "2–1", "aaa/Arsenal-Chelsea"),
            (7, "0–0", "bbb/Leeds-Fulham"),
            (8, "1–3", "ccc/Spurs-Everton"),
            (9, "", "ddd/Brentford-Wolves"),
        ]),
    )
    .await;

    let config = parse_config(&create_test_config(
        &mock_server,
        temp.path(),
        "direct",
        "UNUSED_KEY",
    ))
    .unwrap();

    let mut coordinator = RunCoordinator::from_config(&config, false).unwrap();
    let report = coordinator.run(None).await.unwrap();

    assert_eq!(report.state, RunState::Done);
    assert_eq!(report.period, Some(8));
    assert_eq!(report.served_from, Some(ServedFrom::Network));
    assert_eq!(report.links, 1);

    let artifact = temp.path().join("out").join("Matchweek_8.csv");
    assert_eq!(
        fs::read_to_string(&artifact).unwrap(),
        format!(
            "link,rating\n{}/en/matches/ccc/Spurs-Everton,7.0\n",
            mock_server.uri()
        )
    );

    // Re-running within the cache window does not touch the network again
    let mut again = RunCoordinator::from_config(&config, false).unwrap();
    let report = again.run(Some(7)).await.unwrap();

    assert_eq!(report.served_from, Some(ServedFrom::Cache));
    assert_eq!(report.merged_rows, 2);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    assert!(temp.path().join("out").join("Matchweek_7.csv").is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn test_no_cache_forces_network_fetch() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    mount_schedule(&mock_server, schedule_page(&[(1, "1–0", "aaa/X-Y")])).await;

    let config = parse_config(&create_test_config(
        &mock_server,
        temp.path(),
        "direct",
        "UNUSED_KEY",
    ))
    .unwrap();

    RunCoordinator::from_config(&config, false)
        .unwrap()
        .run(None)
        .await
        .unwrap();
    let report = RunCoordinator::from_config(&config, true)
        .unwrap()
        .run(None)
        .await
        .unwrap();

    assert_eq!(report.served_from, Some(ServedFrom::Network));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_week_without_reports_exits_cleanly() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    mount_schedule(&mock_server, schedule_page(&[(3, "1–0", "aaa/X-Y")])).await;

    let config = parse_config(&create_test_config(
        &mock_server,
        temp.path(),
        "direct",
        "UNUSED_KEY",
    ))
    .unwrap();

    let report = RunCoordinator::from_config(&config, false)
        .unwrap()
        .run(Some(4))
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Aborted);
    assert_eq!(report.abort_reason, Some(AbortReason::NoLinks { period: 4 }));
    assert!(!temp.path().join("weekly_scores").exists());
    assert!(!temp.path().join("out").exists());
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = parse_config(&create_test_config(
        &mock_server,
        temp.path(),
        "scrape-api",
        "MATCHWEEK_TEST_KEY_THAT_IS_NEVER_SET",
    ))
    .unwrap();

    let report = RunCoordinator::from_config(&config, false)
        .unwrap()
        .run(None)
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Aborted);
    assert_eq!(
        report.abort_reason,
        Some(AbortReason::NoContent(FailureKind::MissingCredential {
            variable: "MATCHWEEK_TEST_KEY_THAT_IS_NEVER_SET".to_string()
        }))
    );
    assert_eq!(report.fetch_attempts, 0);
}

#[tokio::test]
async fn test_server_errors_abort_after_retries() {
    let mock_server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SCHEDULE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = parse_config(&create_test_config(
        &mock_server,
        temp.path(),
        "direct",
        "UNUSED_KEY",
    ))
    .unwrap();

    let report = RunCoordinator::from_config(&config, false)
        .unwrap()
        .run(None)
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Aborted);
    assert_eq!(report.fetch_attempts, 2);
    assert!(matches!(
        report.abort_reason,
        Some(AbortReason::NoContent(FailureKind::Exhausted { .. }))
    ));
}
