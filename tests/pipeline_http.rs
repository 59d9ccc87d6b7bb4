//! End-to-end tests: address file → worker pool → HTTP mock server → report.

use std::io::Write;
use std::time::{Duration, Instant};

use batchfetch::{BatchFetcher, Config, Event, report, source};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_json(server: &MockServer, path_str: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Server for the A/B/C scenario: A and C succeed, B answers 500.
async fn scenario_server() -> MockServer {
    let server = MockServer::start().await;

    mount_json(&server, "/posts/1", 200, json!({"id": 1, "title": "alpha", "body": "a"})).await;
    mount_json(
        &server,
        "/posts/1/comments",
        200,
        json!([{"postId": 1, "id": 1, "name": "Alice", "email": "alice@x", "body": "hi"}]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/posts/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_json(
        &server,
        "/posts/2/comments",
        200,
        json!([{"postId": 2, "id": 9, "name": "Nobody", "email": "n@x", "body": "?"}]),
    )
    .await;

    mount_json(&server, "/posts/3", 200, json!({"id": 3, "title": "gamma", "body": "c"})).await;
    mount_json(&server, "/posts/3/comments", 200, json!([])).await;

    server
}

fn config(workers: usize) -> Config {
    Config {
        workers,
        ..Config::default()
    }
}

#[tokio::test]
async fn scenario_report_from_address_file() {
    let server = scenario_server().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for id in 1..=3 {
        writeln!(file, "{}/posts/{id}", server.uri()).unwrap();
        writeln!(file).unwrap();
    }

    let addresses = source::read_addresses(file.path()).await.unwrap();
    assert_eq!(addresses.len(), 3);

    let fetcher = BatchFetcher::new(config(2)).unwrap();
    let results = fetcher.run(addresses).await.unwrap();
    let text = report::render_text(&results);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3 + 1 + 3, "three post lines, separator, three comment blocks:\n{text}");
    assert!(lines.iter().any(|l| l.ends_with("id=1 title=\"alpha\"")), "{text}");
    assert!(lines.iter().any(|l| l.ends_with("id=3 title=\"gamma\"")), "{text}");
    let b = format!("{}/posts/2", server.uri());
    assert!(lines.contains(&format!("❌ error getting post: {b}").as_str()), "{text}");
    assert!(lines.contains(&format!("❌ error getting comments: {b}").as_str()), "{text}");
    assert!(!text.contains("Nobody"), "comments of a failed post are never shown");

    let a_header = lines
        .iter()
        .position(|l| *l == "Following people commented on Post id 1:")
        .unwrap();
    assert_eq!(lines[a_header + 1], "\t(0) 🔹Name: Alice");
    let c_header = lines
        .iter()
        .position(|l| *l == "Following people commented on Post id 3:")
        .unwrap();
    assert!(
        lines
            .get(c_header + 1)
            .is_none_or(|next| !next.starts_with('\t')),
        "empty comment list lists no names:\n{text}"
    );
}

#[tokio::test]
async fn dependent_failure_keeps_post() {
    let server = MockServer::start().await;
    mount_json(&server, "/posts/7", 200, json!({"id": 7, "title": "seven", "body": ""})).await;
    // No comments mock: wiremock answers 404

    let fetcher = BatchFetcher::new(config(1)).unwrap();
    let mut events = fetcher.subscribe();
    let results = fetcher
        .run([format!("{}/posts/7", server.uri())])
        .await
        .unwrap();

    assert!(results[0].succeeded());
    assert_eq!(results[0].post().unwrap().title, "seven");
    assert!(results[0].comments().is_none());

    let mut dependent_failed = false;
    while let Ok(event) = events.try_recv() {
        if let Event::DependentFailed { error, .. } = event {
            assert!(error.contains("404"), "{error}");
            dependent_failed = true;
        }
    }
    assert!(dependent_failed);
}

#[tokio::test]
async fn slow_server_is_bounded_by_fetch_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1, "title": "late", "body": ""}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let mut config = config(2);
    config.fetch.timeout = Duration::from_millis(300);
    let fetcher = BatchFetcher::new(config).unwrap();

    let started = Instant::now();
    let results = fetcher
        .run([
            format!("{}/posts/1", server.uri()),
            format!("{}/posts/2", server.uri()),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|d| !d.succeeded()));
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "timeouts should end the batch early, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn cancelling_mid_batch_returns_every_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1, "title": "late", "body": ""}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let fetcher = BatchFetcher::new(config(2)).unwrap();
    let addresses: Vec<String> = (1..=5)
        .map(|id| format!("{}/posts/{id}", server.uri()))
        .collect();

    let token = fetcher.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let results = tokio::time::timeout(Duration::from_secs(2), fetcher.run(addresses))
        .await
        .expect("cancellation must end the batch within the grace period")
        .unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|d| !d.succeeded()));
}

#[tokio::test]
async fn malformed_addresses_fail_per_item() {
    let server = scenario_server().await;
    let fetcher = BatchFetcher::new(config(2)).unwrap();

    let results = fetcher
        .run([
            "not a url".to_string(),
            format!("{}/posts/1", server.uri()),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let bad = results.iter().find(|d| d.address() == "not a url").unwrap();
    assert!(!bad.succeeded());
    assert_eq!(results.iter().filter(|d| d.succeeded()).count(), 1);
}
