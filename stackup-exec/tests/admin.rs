use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use stackup_exec::http::{HttpClient, HttpError, HttpRequest, HttpResponse};
use stackup_exec::plan::{AdminBootstrap, Credentials, WaitForApi};
use stackup_exec::retry::RetryPolicy;
use stackup_exec::workflow::{ActionError, StepAction};
use url::Url;

/// Replays canned answers in order and keeps every request it saw.
#[derive(Default)]
struct ScriptedHttp {
    answers: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    fn new(answers: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            seen: Mutex::default(),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn send(&self, req: HttpRequest, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.seen.lock().unwrap().push(req);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Other("no scripted answer left".into())))
    }
}

fn status(code: u16, body: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse {
        status: code,
        headers: BTreeMap::new(),
        body: body.as_bytes().to_vec(),
    })
}

fn register_url() -> Url {
    Url::parse("http://localhost:8080/api/v1/auth/register").unwrap()
}

fn bootstrap(http: Arc<ScriptedHttp>, creds: Arc<Credentials>) -> AdminBootstrap {
    AdminBootstrap::new(http, register_url(), "ops@example.com", "admin", creds)
        .with_policy(RetryPolicy::default().with_max_attempts(4))
}

#[tokio::test(start_paused = true)]
async fn registers_admin_after_transient_errors() {
    let http = ScriptedHttp::new(vec![
        Err(HttpError::Network("connection refused".into())),
        status(502, "bad gateway"),
        status(201, r#"{"id":1}"#),
    ]);
    let creds = Arc::new(Credentials::generate());

    bootstrap(http.clone(), creds.clone()).run().await.unwrap();

    assert_eq!(http.calls(), 3);
    let seen = http.seen.lock().unwrap();
    let body: serde_json::Value = serde_json::from_slice(&seen[2].body).unwrap();
    assert_eq!(seen[2].method, "POST");
    assert_eq!(body["username"], "admin");
    assert_eq!(body["email"], "ops@example.com");
    assert_eq!(body["password"], creds.admin_password().expose_secret());
}

#[tokio::test(start_paused = true)]
async fn existing_admin_counts_as_success() {
    let http = ScriptedHttp::new(vec![status(409, r#"{"detail":"user already registered"}"#)]);

    bootstrap(http.clone(), Arc::new(Credentials::generate()))
        .run()
        .await
        .unwrap();

    assert_eq!(http.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn bad_request_is_not_retried() {
    let http = ScriptedHttp::new(vec![status(400, "password too short"), status(201, "")]);

    let err = bootstrap(http.clone(), Arc::new(Credentials::generate()))
        .run()
        .await
        .unwrap_err();

    assert_eq!(http.calls(), 1);
    assert!(matches!(err, ActionError::Retry(_)), "{err:?}");
    assert!(err.to_string().contains("HTTP 400: password too short"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn wait_for_api_retries_until_healthy() {
    let http = ScriptedHttp::new(vec![
        Err(HttpError::Timeout),
        status(503, "starting"),
        status(200, "ok"),
    ]);
    let action = WaitForApi {
        http: http.clone(),
        url: Url::parse("http://localhost:8080/health").unwrap(),
        request_timeout: Duration::from_secs(1),
        policy: RetryPolicy::default(),
    };

    action.run().await.unwrap();

    assert_eq!(http.calls(), 3);
    assert_eq!(http.seen.lock().unwrap()[0].method, "GET");
}

#[tokio::test(start_paused = true)]
async fn wait_for_api_reports_the_last_status_when_exhausted() {
    let http = ScriptedHttp::new(vec![status(503, "starting"), status(502, "bad gateway")]);
    let action = WaitForApi {
        http: http.clone(),
        url: Url::parse("http://localhost:8080/health").unwrap(),
        request_timeout: Duration::from_secs(1),
        policy: RetryPolicy::default().with_max_attempts(2),
    };

    let err = action.run().await.unwrap_err();

    assert_eq!(err.to_string(), "gave up after 2 attempts: HTTP 502: bad gateway");
}
