//! Journey runner against the in-process fake API.

use std::time::Duration;

use api_journey_load::client::ApiClient;
use api_journey_load::domain::Credentials;
use api_journey_load::journey::{self, JourneyRunner, ThinkTime};
use api_journey_load::metrics::{CheckTally, IterationOutcome, MetricsCollector};

use super::mock_api_server::MockApiServer;

fn runner_for(server: &MockApiServer, metrics: &MetricsCollector) -> JourneyRunner {
    let client = ApiClient::new(&server.base_url(), Duration::from_secs(5), metrics.clone())
        .expect("client");
    JourneyRunner::new(client, metrics.clone(), ThinkTime::none())
}

#[tokio::test]
async fn test_full_journey_passes_every_check() {
    let server = MockApiServer::start().await;
    let metrics = MetricsCollector::new();
    let runner = runner_for(&server, &metrics);

    runner.precheck().await.expect("precheck");
    let outcome = runner.run_iteration().await;
    assert_eq!(outcome, IterationOutcome::Completed);

    let summary = metrics.snapshot();
    // health + 8 journey steps
    assert_eq!(summary.http_reqs, 9);
    assert_eq!(summary.http_req_failed, 0);
    // health check + two per step
    assert_eq!(summary.checks.len(), 17);
    assert_eq!(summary.check_totals(), CheckTally { passes: 17, fails: 0 });
    assert_eq!(server.registered_users().await, 1);
    assert_eq!(server.stored_crocodiles().await, 0);
}

#[tokio::test]
async fn test_journey_request_sequence() {
    let server = MockApiServer::start().await;
    let metrics = MetricsCollector::new();
    let runner = runner_for(&server, &metrics);

    let creds = Credentials::generate();
    assert_eq!(
        runner.run_with_credentials(&creds).await,
        IterationOutcome::Completed
    );

    let requests = server.requests().await;
    assert_eq!(
        requests,
        vec![
            "POST /user/register/",
            "POST /auth/token/login/",
            "GET /my/crocodiles/",
            "POST /my/crocodiles/",
            "GET /my/crocodiles/1/",
            "PUT /my/crocodiles/1/",
            "PATCH /my/crocodiles/1/",
            "DELETE /my/crocodiles/1/",
        ]
    );
}

#[tokio::test]
async fn test_iterations_use_distinct_users_and_resources() {
    let server = MockApiServer::start().await;
    let metrics = MetricsCollector::new();
    let runner = runner_for(&server, &metrics);

    for _ in 0..5 {
        assert_eq!(runner.run_iteration().await, IterationOutcome::Completed);
    }

    assert_eq!(server.registered_users().await, 5);
    let summary = metrics.snapshot();
    assert_eq!(summary.checks[journey::CHECK_LIST_EMPTY].fails, 0);
    assert_eq!(summary.checks[journey::CHECK_REGISTER_USERNAME].passes, 5);

    let requests = server.requests().await;
    for id in 1..=5 {
        let path = format!("DELETE /my/crocodiles/{id}/");
        assert_eq!(requests.iter().filter(|r| **r == path).count(), 1);
    }
}

#[tokio::test]
async fn test_reused_credentials_halt_after_login() {
    let server = MockApiServer::start().await;
    let metrics = MetricsCollector::new();
    let runner = runner_for(&server, &metrics);

    let creds = Credentials::generate();
    assert_eq!(
        runner.run_with_credentials(&creds).await,
        IterationOutcome::Completed
    );

    // Same username again: registration is rejected, and a wrong password
    // means login yields no token.
    let clash = Credentials {
        username: creds.username.clone(),
        password: "not-the-password".to_string(),
    };
    assert_eq!(
        runner.run_with_credentials(&clash).await,
        IterationOutcome::HaltedWithoutToken
    );

    let summary = metrics.snapshot();
    assert_eq!(
        summary.checks[journey::CHECK_REGISTER_STATUS],
        CheckTally { passes: 1, fails: 1 }
    );
    assert_eq!(
        summary.checks[journey::CHECK_LOGIN_TOKEN],
        CheckTally { passes: 1, fails: 1 }
    );
    // no resource calls on the second iteration
    assert_eq!(summary.checks[journey::CHECK_LIST_STATUS].total(), 1);

    let requests = server.requests().await;
    assert_eq!(requests.len(), 8 + 2);
}
