//! Tests for the transform trigger

use super::*;
use crate::config::TransformConfig;
use crate::error::Error;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCOUNT: &str = "12345";
const JOB: &str = "70471823452790";

fn config(base_url: &str) -> TransformConfig {
    TransformConfig {
        base_url: base_url.to_string(),
        account_id: Some(ACCOUNT.to_string()),
        api_token: Some("dbt-token".to_string()),
        job_id: Some(JOB.to_string()),
        ..TransformConfig::default()
    }
}

fn trigger(server: &MockServer) -> DbtCloudTrigger {
    DbtCloudTrigger::from_config(&config(&server.uri()))
        .unwrap()
        .with_polling(Duration::from_millis(10), Duration::from_millis(200))
}

async fn mount_trigger(server: &MockServer, run_id: i64) {
    Mock::given(method("POST"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/jobs/{JOB}/run/")))
        .and(header("Authorization", "Token dbt-token"))
        .and(body_json(json!({ "cause": "Triggered by dublintrips pipeline" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": run_id, "status": 1 } })),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn run_status(status: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 99, "status": status } }))
}

#[test_case(1, RunState::Queued, false ; "queued")]
#[test_case(3, RunState::Running, false ; "running")]
#[test_case(10, RunState::Success, true ; "success")]
#[test_case(20, RunState::Error, true ; "error")]
#[test_case(30, RunState::Cancelled, true ; "cancelled")]
#[test_case(7, RunState::Unknown(7), false ; "unknown")]
fn test_run_state_codes(code: i64, expected: RunState, terminal: bool) {
    let state = RunState::from_code(code);
    assert_eq!(state, expected);
    assert_eq!(state.is_terminal(), terminal);
}

#[test]
fn test_requires_credentials() {
    let mut cfg = config("https://cloud.getdbt.com");
    cfg.api_token = None;
    let err = DbtCloudTrigger::from_config(&cfg).unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { ref field } if field == "DBT_CLOUD_API_TOKEN"));
}

#[tokio::test]
async fn test_run_succeeds_after_polling() {
    let server = MockServer::start().await;
    mount_trigger(&server, 99).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/runs/99/")))
        .respond_with(run_status(3))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/runs/99/")))
        .respond_with(run_status(10))
        .mount(&server)
        .await;

    let run = trigger(&server).run().await.unwrap();

    assert_eq!(run.run_id, "99");
    assert_eq!(run.state, RunState::Success);
    assert_eq!(run.polls, 3);
}

#[tokio::test]
async fn test_error_status_fails_run() {
    let server = MockServer::start().await;
    mount_trigger(&server, 99).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/runs/99/")))
        .respond_with(run_status(20))
        .mount(&server)
        .await;

    let err = trigger(&server).run().await.unwrap_err();
    match err {
        Error::TransformFailed { run_id, status } => {
            assert_eq!(run_id, "99");
            assert_eq!(status, "error");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_cancelled_run_fails() {
    let server = MockServer::start().await;
    mount_trigger(&server, 99).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/runs/99/")))
        .respond_with(run_status(30))
        .mount(&server)
        .await;

    let err = trigger(&server).run().await.unwrap_err();
    assert!(matches!(err, Error::TransformFailed { .. }));
}

#[tokio::test]
async fn test_run_that_never_finishes_times_out() {
    let server = MockServer::start().await;
    mount_trigger(&server, 99).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/runs/99/")))
        .respond_with(run_status(3))
        .mount(&server)
        .await;

    let trigger = DbtCloudTrigger::from_config(&config(&server.uri()))
        .unwrap()
        .with_polling(Duration::from_millis(20), Duration::from_millis(100));
    let err = trigger.run().await.unwrap_err();

    assert!(matches!(err, Error::TransformTimeout { ref run_id, .. } if run_id == "99"));
}

#[tokio::test]
async fn test_trigger_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/jobs/{JOB}/run/")))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
        .mount(&server)
        .await;

    let err = trigger(&server).run().await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

#[tokio::test]
async fn test_missing_run_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/v2/accounts/{ACCOUNT}/jobs/{JOB}/run/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    assert!(trigger(&server).trigger().await.is_err());
}
