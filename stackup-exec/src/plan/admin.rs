use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::info;
use url::Url;

use crate::http::{HttpClient, HttpRequest};
use crate::plan::credentials::Credentials;
use crate::retry::{classify_registration, Completion, OperationError, RetryExecutor, RetryPolicy};
use crate::workflow::{ActionResult, StepAction};

/// Registers the first admin account. An "already exists" answer counts as done, so the
/// step can be re-run against a stack that was bootstrapped before.
pub struct AdminBootstrap {
    http: Arc<dyn HttpClient>,
    url: Url,
    request_timeout: Duration,
    email: String,
    username: String,
    credentials: Arc<Credentials>,
    policy: RetryPolicy,
}

impl AdminBootstrap {
    pub fn new(
        http: Arc<dyn HttpClient>,
        url: Url,
        email: impl Into<String>,
        username: impl Into<String>,
        credentials: Arc<Credentials>,
    ) -> Self {
        Self {
            http,
            url,
            request_timeout: Duration::from_secs(10),
            email: email.into(),
            username: username.into(),
            credentials,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn register_once(&self) -> Result<(), OperationError> {
        let body = json!({
            "email": self.email,
            "username": self.username,
            "password": self.credentials.admin_password().expose_secret(),
        });
        let req = HttpRequest::post_json(self.url.clone(), &body);
        let resp = self.http.send(req, self.request_timeout).await?;
        if resp.is_success() {
            return Ok(());
        }
        Err(OperationError::with_status(resp.status, resp.text()))
    }
}

#[async_trait]
impl StepAction for AdminBootstrap {
    async fn run(&self) -> ActionResult {
        let executor = RetryExecutor::new(self.policy.clone());
        match executor
            .retry_classified(|| self.register_once(), classify_registration)
            .await?
        {
            Completion::Succeeded { attempts, .. } => {
                info!(user = %self.username, attempts, "admin account created")
            }
            Completion::AlreadySatisfied { error, attempts } => {
                info!(user = %self.username, attempts, reason = %error, "admin account already present")
            }
        }
        Ok(())
    }
}
