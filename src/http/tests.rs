//! Tests for the HTTP client module

use super::*;
use crate::config::HttpSettings;
use crate::error::Error;
use crate::types::{BackoffType, FailureKind};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpClient {
    HttpClient::with_config(HttpClientConfig::default()).unwrap()
}

#[test]
fn test_config_from_settings() {
    let settings = HttpSettings {
        timeout_secs: 60,
        retries: 2,
        backoff: BackoffType::Linear,
        initial_backoff_ms: 200,
        max_backoff_ms: 10_000,
    };
    let config = HttpClientConfig::from(&settings).with_base_url("https://cloud.getdbt.com");

    assert_eq!(config.base_url.as_deref(), Some("https://cloud.getdbt.com"));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_backoff, Duration::from_secs(10));

    let defaults = HttpClientConfig::default();
    assert_eq!(defaults.timeout, Duration::from_secs(30));
    assert_eq!(defaults.max_retries, 0);
}

#[tokio::test]
async fn test_get_returns_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download/routes.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("route,link\n1,A\n"))
        .mount(&mock_server)
        .await;

    let response = client()
        .get(&format!("{}/download/routes.csv", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.text().await.unwrap(), "route,link\n1,A\n");
}

#[tokio::test]
async fn test_404_is_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.csv"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let err = client()
        .get(&format!("{}/missing.csv", mock_server.uri()))
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client().get(&format!("{}/flaky", mock_server.uri())).await;
    assert!(matches!(result, Err(Error::HttpStatus { status: 503, .. })));
}

#[tokio::test]
async fn test_retry_on_500_when_enabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let settings = HttpSettings {
        retries: 2,
        backoff: BackoffType::Constant,
        initial_backoff_ms: 10,
        ..HttpSettings::default()
    };
    let client = HttpClient::with_config(HttpClientConfig::from(&settings)).unwrap();
    let response = client
        .get(&format!("{}/flaky", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&mock_server)
        .await;

    let settings = HttpSettings {
        retries: 2,
        initial_backoff_ms: 5,
        ..HttpSettings::default()
    };
    let client = HttpClient::with_config(HttpClientConfig::from(&settings)).unwrap();
    let err = client
        .get(&format!("{}/down", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_post_json_with_default_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/accounts/1/jobs/2/run/"))
        .and(header("Authorization", "Token secret"))
        .and(body_json(serde_json::json!({"cause": "test"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"id": 7}})),
        )
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::default()
        .with_base_url(mock_server.uri())
        .with_header("Authorization", "Token secret");
    let client = HttpClient::with_config(config).unwrap();

    let value: serde_json::Value = client
        .post_json(
            "/api/v2/accounts/1/jobs/2/run/",
            serde_json::json!({"cause": "test"}),
        )
        .await
        .unwrap();
    assert_eq!(value["data"]["id"], 7);
}

#[tokio::test]
async fn test_bad_json_is_malformed_not_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/accounts/1/runs/9/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client =
        HttpClient::with_config(HttpClientConfig::default().with_base_url(mock_server.uri()))
            .unwrap();
    let err = client
        .get_json::<serde_json::Value>("/api/v2/accounts/1/runs/9/")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::JsonParse(_)));
    assert_eq!(err.kind(), FailureKind::Malformed);
}

#[test]
fn test_backoff_calculation() {
    let settings = HttpSettings {
        initial_backoff_ms: 100,
        max_backoff_ms: 500,
        ..HttpSettings::default()
    };
    let client = HttpClient::with_config(HttpClientConfig::from(&settings)).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(client.calculate_backoff(3), Duration::from_millis(500));

    let linear = HttpSettings {
        backoff: BackoffType::Linear,
        ..settings
    };
    let client = HttpClient::with_config(HttpClientConfig::from(&linear)).unwrap();
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_backoff_setting_parses_from_yaml() {
    let settings: HttpSettings =
        serde_yaml::from_str("retries: 3\nbackoff: constant\ninitial_backoff_ms: 250\n").unwrap();
    assert_eq!(settings.retries, 3);
    assert_eq!(settings.backoff, BackoffType::Constant);
    assert_eq!(settings.initial_backoff(), Duration::from_millis(250));
    assert_eq!(settings.timeout_secs, 30);
}
