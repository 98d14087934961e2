//! Timed HTTP client for the journey's endpoints.
//!
//! Every call is attempted exactly once and always yields an [`ApiResponse`];
//! transport failures become status 0 so the caller's checks fail instead of
//! the iteration erroring out.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::{Credentials, CrocodilePatch, NewCrocodile, ResourceId, Session, Step};
use crate::error::Result;
use crate::metrics::MetricsCollector;

const USER_AGENT_VALUE: &str = concat!("api-journey-load/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
    pub raw_len: usize,
    pub duration: Duration,
}

impl ApiResponse {
    pub fn has_status(&self, status: u16) -> bool {
        self.status == status
    }

    /// True when the response carried no body at all.
    pub fn is_empty(&self) -> bool {
        self.raw_len == 0
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|b| b.get(key))
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        self.body
            .as_ref()
            .and_then(|b| serde_json::from_value(b.clone()).ok())
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    metrics: MetricsCollector,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, metrics: MetricsCollector) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn crocodile_url(&self, id: ResourceId) -> String {
        self.url(&format!("/my/crocodiles/{id}/"))
    }

    /// `GET /`
    pub async fn health(&self) -> ApiResponse {
        self.send(Step::Health, self.client.get(self.url("/"))).await
    }

    /// `POST /user/register/`
    pub async fn register(&self, creds: &Credentials) -> ApiResponse {
        let request = self.client.post(self.url("/user/register/")).json(creds);
        self.send(Step::Register, request).await
    }

    /// `POST /auth/token/login/`
    pub async fn login(&self, creds: &Credentials) -> ApiResponse {
        let request = self.client.post(self.url("/auth/token/login/")).json(creds);
        self.send(Step::Login, request).await
    }

    /// `GET /my/crocodiles/`
    pub async fn list(&self, session: &Session) -> ApiResponse {
        let request = self
            .client
            .get(self.url("/my/crocodiles/"))
            .bearer_auth(session.access_token());
        self.send(Step::List, request).await
    }

    /// `POST /my/crocodiles/`
    pub async fn create(&self, session: &Session, payload: &NewCrocodile) -> ApiResponse {
        let request = self
            .client
            .post(self.url("/my/crocodiles/"))
            .bearer_auth(session.access_token())
            .json(payload);
        self.send(Step::Create, request).await
    }

    /// `GET /my/crocodiles/{id}/`
    pub async fn read(&self, session: &Session, id: ResourceId) -> ApiResponse {
        let request = self
            .client
            .get(self.crocodile_url(id))
            .bearer_auth(session.access_token());
        self.send(Step::Read, request).await
    }

    /// `PUT /my/crocodiles/{id}/`
    pub async fn update(
        &self,
        session: &Session,
        id: ResourceId,
        payload: &NewCrocodile,
    ) -> ApiResponse {
        let request = self
            .client
            .put(self.crocodile_url(id))
            .bearer_auth(session.access_token())
            .json(payload);
        self.send(Step::Update, request).await
    }

    /// `PATCH /my/crocodiles/{id}/`
    pub async fn patch(
        &self,
        session: &Session,
        id: ResourceId,
        payload: &CrocodilePatch,
    ) -> ApiResponse {
        let request = self
            .client
            .patch(self.crocodile_url(id))
            .bearer_auth(session.access_token())
            .json(payload);
        self.send(Step::Patch, request).await
    }

    /// `DELETE /my/crocodiles/{id}/`
    pub async fn delete(&self, session: &Session, id: ResourceId) -> ApiResponse {
        let request = self
            .client
            .delete(self.crocodile_url(id))
            .bearer_auth(session.access_token());
        self.send(Step::Delete, request).await
    }

    async fn send(&self, step: Step, request: RequestBuilder) -> ApiResponse {
        let start = Instant::now();
        let result = async {
            let resp = request.send().await?;
            let status = resp.status().as_u16();
            let text = resp.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        }
        .await;
        let duration = start.elapsed();

        let response = match result {
            Ok((status, text)) => ApiResponse {
                status,
                body: serde_json::from_str(&text).ok(),
                raw_len: text.len(),
                duration,
            },
            Err(e) => {
                warn!(%step, error = %e, "request failed");
                ApiResponse {
                    status: 0,
                    body: None,
                    raw_len: 0,
                    duration,
                }
            }
        };

        debug!(%step, status = response.status, duration_ms = duration.as_millis() as u64, "request");
        self.metrics
            .record_request(step, response.status, response.duration);
        response
    }
}
