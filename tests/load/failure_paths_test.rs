//! Degraded API behaviour, scripted with wiremock.

use std::time::Duration;

use api_journey_load::client::ApiClient;
use api_journey_load::error::SETUP_ABORTED_EXIT_CODE;
use api_journey_load::journey::{self, JourneyRunner, ThinkTime};
use api_journey_load::metrics::{CheckTally, IterationOutcome, MetricsCollector};
use api_journey_load::LoadTestError;
use serde_json::json;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn runner_for(server: &MockServer, metrics: &MetricsCollector) -> JourneyRunner {
    let client =
        ApiClient::new(&server.uri(), Duration::from_secs(5), metrics.clone()).expect("client");
    JourneyRunner::new(client, metrics.clone(), ThinkTime::none())
}

/// Echo the submitted username back with 201.
fn echo_username(req: &Request) -> ResponseTemplate {
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap_or_default();
    ResponseTemplate::new(201).set_body_json(json!({"username": body["username"]}))
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/user/register/"))
        .respond_with(echo_username)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "tok"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_precheck_aborts_on_unhealthy_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    let runner = runner_for(&server, &metrics);

    let err = runner.precheck().await.unwrap_err();
    assert!(matches!(err, LoadTestError::Unavailable(_)));
    assert_eq!(err.exit_code(), SETUP_ABORTED_EXIT_CODE);
    assert_eq!(
        metrics.snapshot().checks[journey::CHECK_HEALTH_STATUS],
        CheckTally { passes: 0, fails: 1 }
    );
}

#[tokio::test]
async fn test_precheck_aborts_when_target_is_down() {
    let metrics = MetricsCollector::new();
    // nothing listens on the discard port
    let client =
        ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2), metrics.clone()).unwrap();
    let runner = JourneyRunner::new(client, metrics.clone(), ThinkTime::none());

    assert!(runner.precheck().await.is_err());
    let summary = metrics.snapshot();
    assert_eq!(summary.http_reqs, 1);
    assert_eq!(summary.http_req_failed, 1);
}

#[tokio::test]
async fn test_missing_token_halts_before_resource_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/register/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"username": ["taken"]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "nope"})))
        .mount(&server)
        .await;
    Mock::given(path_regex("^/my/crocodiles/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    let outcome = runner_for(&server, &metrics).run_iteration().await;
    assert_eq!(outcome, IterationOutcome::HaltedWithoutToken);

    let summary = metrics.snapshot();
    assert_eq!(summary.http_reqs, 2);
    assert_eq!(summary.check_totals(), CheckTally { passes: 0, fails: 4 });
}

#[tokio::test]
async fn test_missing_id_halts_after_create() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/my/crocodiles/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": null, "name": "Oleh"})))
        .mount(&server)
        .await;
    Mock::given(path_regex(r"^/my/crocodiles/\d+/$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    let outcome = runner_for(&server, &metrics).run_iteration().await;
    assert_eq!(outcome, IterationOutcome::HaltedWithoutResource);

    let summary = metrics.snapshot();
    assert_eq!(summary.http_reqs, 4);
    assert_eq!(summary.checks[journey::CHECK_CREATE_STATUS].passes, 1);
    assert_eq!(summary.checks[journey::CHECK_CREATE_ID].fails, 1);
    assert_eq!(summary.checks[journey::CHECK_LIST_EMPTY].passes, 1);
}

#[tokio::test]
async fn test_step_failures_are_tallied_not_fatal() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    // a fresh user who already owns something
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 99}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/my/crocodiles/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"id": 7, "name": "Oleh", "sex": "M", "date_of_birth": "2010-05-15"}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "sex": "F"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .expect(1)
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    let outcome = runner_for(&server, &metrics).run_iteration().await;
    assert_eq!(outcome, IterationOutcome::Completed);

    let summary = metrics.snapshot();
    assert_eq!(summary.checks[journey::CHECK_LIST_EMPTY].fails, 1);
    assert_eq!(summary.checks[journey::CHECK_UPDATE_STATUS].fails, 1);
    assert_eq!(summary.checks[journey::CHECK_UPDATE_NAME].fails, 1);
    assert_eq!(summary.checks[journey::CHECK_PATCH_SEX].passes, 1);
    assert_eq!(summary.checks[journey::CHECK_DELETE_STATUS].passes, 1);
    assert_eq!(summary.checks[journey::CHECK_DELETE_ACK].passes, 1);
    assert_eq!(summary.http_req_failed, 1);
    assert_eq!(summary.check_totals(), CheckTally { passes: 13, fails: 3 });
}

/// Fresh empty list, then create answers with `id`.
async fn mount_list_and_create(server: &MockServer, id: u64) {
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/my/crocodiles/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": id})))
        .mount(server)
        .await;
}

async fn mount_update_and_patch(server: &MockServer, id: u64) {
    let item = format!("/my/crocodiles/{id}/");
    Mock::given(method("PUT"))
        .and(path(item.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "name": "Anzhella"})))
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(item.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "sex": "F"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_read_only_needs_matching_id() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_list_and_create(&server, 7).await;
    // date in a non-ISO format and an unknown sex code
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"id": 7, "name": "Oleh", "sex": "X", "date_of_birth": "15.05.2010"}),
        ))
        .mount(&server)
        .await;
    mount_update_and_patch(&server, 7).await;
    Mock::given(method("DELETE"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    let outcome = runner_for(&server, &metrics).run_iteration().await;
    assert_eq!(outcome, IterationOutcome::Completed);

    let summary = metrics.snapshot();
    assert_eq!(
        summary.checks[journey::CHECK_READ_ID],
        CheckTally { passes: 1, fails: 0 }
    );
    assert_eq!(summary.check_totals(), CheckTally { passes: 16, fails: 0 });
}

#[tokio::test]
async fn test_read_with_other_id_fails_check() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_list_and_create(&server, 7).await;
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 8, "name": "Oleh"})))
        .mount(&server)
        .await;
    mount_update_and_patch(&server, 7).await;
    Mock::given(method("DELETE"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    runner_for(&server, &metrics).run_iteration().await;

    let summary = metrics.snapshot();
    assert_eq!(
        summary.checks[journey::CHECK_READ_ID],
        CheckTally { passes: 0, fails: 1 }
    );
    assert_eq!(summary.checks[journey::CHECK_READ_STATUS].passes, 1);
}

#[tokio::test]
async fn test_transport_error_mid_journey_is_status_zero() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_list_and_create(&server, 7).await;
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Anzhella"})))
        .mount(&server)
        .await;
    // outlives the client timeout
    Mock::given(method("PATCH"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sex": "F"}))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    let client =
        ApiClient::new(&server.uri(), Duration::from_secs(1), metrics.clone()).expect("client");
    let runner = JourneyRunner::new(client, metrics.clone(), ThinkTime::none());

    // no retry, the journey carries on to delete
    assert_eq!(runner.run_iteration().await, IterationOutcome::Completed);

    let summary = metrics.snapshot();
    assert_eq!(summary.http_reqs, 8);
    assert_eq!(summary.http_req_failed, 1);
    assert_eq!(
        summary.checks[journey::CHECK_PATCH_STATUS],
        CheckTally { passes: 0, fails: 1 }
    );
    assert_eq!(
        summary.checks[journey::CHECK_PATCH_SEX],
        CheckTally { passes: 0, fails: 1 }
    );
    assert_eq!(summary.checks[journey::CHECK_DELETE_ACK].passes, 1);
}

#[tokio::test]
async fn test_unexpected_delete_status_fails_both_checks() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_list_and_create(&server, 7).await;
    Mock::given(method("GET"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .mount(&server)
        .await;
    mount_update_and_patch(&server, 7).await;
    Mock::given(method("DELETE"))
        .and(path("/my/crocodiles/7/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let metrics = MetricsCollector::new();
    let outcome = runner_for(&server, &metrics).run_iteration().await;
    assert_eq!(outcome, IterationOutcome::Completed);

    let summary = metrics.snapshot();
    assert_eq!(
        summary.checks[journey::CHECK_DELETE_STATUS],
        CheckTally { passes: 0, fails: 1 }
    );
    assert_eq!(
        summary.checks[journey::CHECK_DELETE_ACK],
        CheckTally { passes: 0, fails: 1 }
    );
    assert_eq!(summary.http_req_failed, 1);
}
