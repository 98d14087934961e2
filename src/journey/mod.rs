//! The user journey: register, log in, then list/create/read/update/patch/
//! delete one crocodile, with think-time between steps.
//!
//! Each step records two named checks (status code, then payload). A failed
//! check never aborts the run; the iteration only stops early when there is
//! no token or no created id left to continue with.

pub mod think_time;

pub use think_time::ThinkTime;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ApiClient, ApiResponse};
use crate::domain::{
    Credentials, CrocodilePatch, NewCrocodile, ResourceId, Session, Sex, UPDATED_NAME,
};
use crate::driver::{Scenario, VuContext};
use crate::error::{LoadTestError, Result};
use crate::metrics::{IterationOutcome, MetricsCollector};

pub const CHECK_HEALTH_STATUS: &str = "health status is 200";
pub const CHECK_REGISTER_STATUS: &str = "register status is 201";
pub const CHECK_REGISTER_USERNAME: &str = "register echoes username";
pub const CHECK_LOGIN_STATUS: &str = "login status is 200";
pub const CHECK_LOGIN_TOKEN: &str = "login returns access token";
pub const CHECK_LIST_STATUS: &str = "list status is 200";
pub const CHECK_LIST_EMPTY: &str = "list is empty for new user";
pub const CHECK_CREATE_STATUS: &str = "create status is 201";
pub const CHECK_CREATE_ID: &str = "create returns id";
pub const CHECK_READ_STATUS: &str = "read status is 200";
pub const CHECK_READ_ID: &str = "read echoes id";
pub const CHECK_UPDATE_STATUS: &str = "update status is 200";
pub const CHECK_UPDATE_NAME: &str = "update echoes name";
pub const CHECK_PATCH_STATUS: &str = "patch status is 200";
pub const CHECK_PATCH_SEX: &str = "patch echoes sex";
pub const CHECK_DELETE_STATUS: &str = "delete status is 204 or 200";
pub const CHECK_DELETE_ACK: &str = "delete acknowledged";

#[derive(Clone)]
pub struct JourneyRunner {
    client: ApiClient,
    metrics: MetricsCollector,
    think_time: ThinkTime,
}

impl JourneyRunner {
    pub fn new(client: ApiClient, metrics: MetricsCollector, think_time: ThinkTime) -> Self {
        Self {
            client,
            metrics,
            think_time,
        }
    }

    fn check(&self, name: &str, passed: bool) -> bool {
        if !passed {
            debug!(check = name, "check failed");
        }
        self.metrics.record_check(name, passed)
    }

    fn check_status(&self, name: &str, resp: &ApiResponse, expected: &[u16]) -> bool {
        self.check(name, expected.contains(&resp.status))
    }

    /// Runs once before any iteration. A non-200 health response aborts the
    /// whole test.
    pub async fn precheck(&self) -> Result<()> {
        let resp = self.client.health().await;
        if self.check_status(CHECK_HEALTH_STATUS, &resp, &[200]) {
            info!(base_url = self.client.base_url(), "target is available");
            Ok(())
        } else {
            Err(LoadTestError::Unavailable(format!(
                "GET {}/ returned status {}",
                self.client.base_url(),
                resp.status
            )))
        }
    }

    /// One iteration with freshly generated credentials.
    pub async fn run_iteration(&self) -> IterationOutcome {
        let creds = Credentials::generate();
        self.run_with_credentials(&creds).await
    }

    pub async fn run_with_credentials(&self, creds: &Credentials) -> IterationOutcome {
        // register
        let resp = self.client.register(creds).await;
        self.check_status(CHECK_REGISTER_STATUS, &resp, &[201]);
        self.check(
            CHECK_REGISTER_USERNAME,
            resp.field_str("username") == Some(creds.username.as_str()),
        );
        self.think_time.pause().await;

        // login
        let resp = self.client.login(creds).await;
        self.check_status(CHECK_LOGIN_STATUS, &resp, &[200]);
        let session = resp.body.as_ref().and_then(Session::from_login_body);
        self.check(CHECK_LOGIN_TOKEN, session.is_some());
        let Some(session) = session else {
            debug!(username = %creds.username, "no access token, ending iteration");
            return IterationOutcome::HaltedWithoutToken;
        };
        self.think_time.pause().await;

        // list
        let resp = self.client.list(&session).await;
        self.check_status(CHECK_LIST_STATUS, &resp, &[200]);
        self.check(
            CHECK_LIST_EMPTY,
            resp.body
                .as_ref()
                .and_then(Value::as_array)
                .is_some_and(|items| items.is_empty()),
        );
        self.think_time.pause().await;

        // create
        let resp = self.client.create(&session, &NewCrocodile::sample()).await;
        self.check_status(CHECK_CREATE_STATUS, &resp, &[201]);
        let id = resp.body.as_ref().and_then(ResourceId::from_body);
        self.check(CHECK_CREATE_ID, id.is_some());
        let Some(id) = id else {
            debug!(username = %creds.username, "no resource id, ending iteration");
            return IterationOutcome::HaltedWithoutResource;
        };
        self.think_time.pause().await;

        // read
        let resp = self.client.read(&session, id).await;
        self.check_status(CHECK_READ_STATUS, &resp, &[200]);
        self.check(
            CHECK_READ_ID,
            resp.body.as_ref().is_some_and(|body| id.matches(body)),
        );
        self.think_time.pause().await;

        // full update
        let resp = self
            .client
            .update(&session, id, &NewCrocodile::renamed_sample())
            .await;
        self.check_status(CHECK_UPDATE_STATUS, &resp, &[200]);
        self.check(CHECK_UPDATE_NAME, resp.field_str("name") == Some(UPDATED_NAME));
        self.think_time.pause().await;

        // partial update
        let resp = self
            .client
            .patch(&session, id, &CrocodilePatch::sex(Sex::Female))
            .await;
        self.check_status(CHECK_PATCH_STATUS, &resp, &[200]);
        self.check(
            CHECK_PATCH_SEX,
            resp.field_str("sex") == Some(Sex::Female.as_str()),
        );
        self.think_time.pause().await;

        // delete
        let resp = self.client.delete(&session, id).await;
        self.check_status(CHECK_DELETE_STATUS, &resp, &[204, 200]);
        let acknowledged = match resp.status {
            204 => resp.is_empty(),
            200 => resp.body.is_some(),
            _ => false,
        };
        self.check(CHECK_DELETE_ACK, acknowledged);

        IterationOutcome::Completed
    }
}

#[async_trait]
impl Scenario for JourneyRunner {
    fn name(&self) -> &str {
        "crocodile-journey"
    }

    async fn iteration(&self, _vu: VuContext) -> IterationOutcome {
        self.run_iteration().await
    }
}
