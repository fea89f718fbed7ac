use api_lib::adapters::JsonFileHistoryStore;
use api_lib::web::{self, auth::AccessGate, state::AppState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tax_blog_core::pipeline::{DRAFT_FAILED_MESSAGE, OFFLINE_MESSAGE};
use tax_blog_core::{
    ConnectivityProbe, ContentPipeline, ContentRequest, ContentResponse, GeneratedImage,
    GenerativeModelService, ImageRequest, ModelSelection, PortError, PortResult, ResponseFormat,
    SiteProfile,
};
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

const ACCESS_CODE: &str = "letmein";

//=========================================================================================
// Fakes and Helpers
//=========================================================================================

#[derive(Default)]
struct CannedModel {
    fail_drafts: bool,
    /// How long each draft call takes.
    draft_delay: Option<Duration>,
    /// When set, draft calls wait for a notification before answering.
    draft_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl GenerativeModelService for CannedModel {
    async fn generate_content(&self, request: ContentRequest) -> PortResult<ContentResponse> {
        let prompt = request.prompt_text();
        let text = if request.response_format == ResponseFormat::Json {
            r#"{"metaTitle":"Standard Deduction 2025","metaDescription":"What changed.","slug":"standard-deduction-2025"}"#
        } else if prompt.contains("Write a professional, accurate blog post") {
            if let Some(delay) = self.draft_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(gate) = &self.draft_gate {
                gate.notified().await;
            }
            if self.fail_drafts {
                return Err(PortError::Upstream {
                    status: 503,
                    message: "overloaded".to_string(),
                });
            }
            "<h2>What changed for 2025</h2><p>The deduction went up.</p>"
        } else if prompt.contains("SEO strategist") {
            r#"["standard deduction 2025","tax brackets"]"#
        } else {
            "The IRS raised the standard deduction."
        };
        Ok(ContentResponse {
            text: text.to_string(),
            citations: Vec::new(),
        })
    }

    async fn generate_image(&self, _request: ImageRequest) -> PortResult<GeneratedImage> {
        Err(PortError::Upstream {
            status: 500,
            message: "quota exceeded".to_string(),
        })
    }
}

struct Switch(AtomicBool);

#[async_trait]
impl ConnectivityProbe for Switch {
    async fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct TestApp {
    router: Router,
    online: Arc<Switch>,
    _dir: TempDir,
}

async fn test_app(fail_drafts: bool) -> TestApp {
    test_app_with(CannedModel {
        fail_drafts,
        ..Default::default()
    })
    .await
}

async fn test_app_with(model: CannedModel) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(JsonFileHistoryStore::open(dir.path().join("history.json")).await);
    let online = Arc::new(Switch(AtomicBool::new(true)));
    let pipeline = ContentPipeline::new(
        Arc::new(model),
        online.clone(),
        history,
        ModelSelection::default(),
        SiteProfile::default(),
    );
    let state = Arc::new(AppState::new(pipeline, AccessGate::new(ACCESS_CODE)));
    TestApp {
        router: web::router(state),
        online,
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn login(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "accessCode": ACCESS_CODE }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn submission(topic: &str) -> Value {
    json!({ "category": "Individual", "topic": topic })
}

/// Polls `/generations/current` until its status is `wanted` or two seconds pass.
async fn wait_for_status(router: &Router, cookie: &str, wanted: &str) -> Value {
    let mut current = Value::Null;
    for _ in 0..100 {
        current = send(router, empty_request("GET", "/generations/current", cookie))
            .await
            .1;
        if current["status"] == wanted {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    current
}

//=========================================================================================
// Access Gate
//=========================================================================================

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = test_app(false).await;

    let request = Request::builder().uri("/history").body(Body::empty()).unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, empty_request("GET", "/history", "session=forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_access_code_is_rejected() {
    let app = test_app(false).await;
    let (status, body) = send(
        &app.router,
        json_request("POST", "/auth/login", None, json!({ "accessCode": "LETMEIN" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, Value::String("Incorrect access code.".to_string()));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;

    let (status, _) = send(&app.router, empty_request("POST", "/auth/logout", &cookie)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, empty_request("GET", "/status", &cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

//=========================================================================================
// Form and Status
//=========================================================================================

#[tokio::test]
async fn form_options_list_choices_and_author() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;

    let (status, body) = send(&app.router, empty_request("GET", "/form-options", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!(["Individual", "Business"]));
    assert_eq!(body["tones"].as_array().unwrap().len(), 5);
    assert_eq!(body["wordCounts"].as_array().unwrap().len(), 4);
    assert_eq!(body["author"]["name"], "ARUN KP");
}

#[tokio::test]
async fn status_reports_connectivity() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;

    let (_, body) = send(&app.router, empty_request("GET", "/status", &cookie)).await;
    assert_eq!(body["online"], true);

    app.online.0.store(false, Ordering::SeqCst);
    let (_, body) = send(&app.router, empty_request("GET", "/status", &cookie)).await;
    assert_eq!(body["online"], false);
}

//=========================================================================================
// Generation
//=========================================================================================

#[tokio::test]
async fn generation_completes_and_lands_in_history() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/generations",
            Some(&cookie),
            submission("Standard deduction 2025"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "complete");
    assert_eq!(body["topic"], "Standard deduction 2025");
    assert_eq!(
        body["keywords"],
        json!(["standard deduction 2025", "tax brackets"])
    );
    assert!(body["blogContent"]
        .as_str()
        .unwrap()
        .contains("What changed for 2025"));
    assert_eq!(body["seoMetadata"]["slug"], "standard-deduction-2025");
    assert!(body.get("error").is_none());

    let (_, current) = send(
        &app.router,
        empty_request("GET", "/generations/current", &cookie),
    )
    .await;
    assert_eq!(current, body);

    let (_, history) = send(&app.router, empty_request("GET", "/history", &cookie)).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["topic"], "Standard deduction 2025");
    assert_eq!(history[0]["blogContent"], body["blogContent"]);
}

#[tokio::test]
async fn blank_topic_is_a_bad_request() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;

    let (status, _) = send(
        &app.router,
        json_request("POST", "/generations", Some(&cookie), submission("   ")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, current) = send(
        &app.router,
        empty_request("GET", "/generations/current", &cookie),
    )
    .await;
    assert_eq!(current["status"], "idle");
}

#[tokio::test]
async fn offline_generation_reports_the_error() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;
    app.online.0.store(false, Ordering::SeqCst);

    let (status, body) = send(
        &app.router,
        json_request("POST", "/generations", Some(&cookie), submission("FBAR deadlines")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], OFFLINE_MESSAGE);

    let (_, history) = send(&app.router, empty_request("GET", "/history", &cookie)).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn failed_draft_keeps_research_and_reports_the_error() {
    let app = test_app(true).await;
    let cookie = login(&app.router).await;

    let (status, body) = send(
        &app.router,
        json_request("POST", "/generations", Some(&cookie), submission("S-Corp election")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], DRAFT_FAILED_MESSAGE);
    assert_eq!(
        body["researchData"]["text"],
        "The IRS raised the standard deduction."
    );
    assert!(body.get("blogContent").is_none());
}

#[tokio::test]
async fn run_finishes_after_the_client_disconnects() {
    let app = test_app_with(CannedModel {
        draft_delay: Some(Duration::from_millis(300)),
        ..Default::default()
    })
    .await;
    let cookie = login(&app.router).await;

    let request = json_request(
        "POST",
        "/generations",
        Some(&cookie),
        submission("Estimated tax penalties"),
    );
    let dropped = tokio::time::timeout(
        Duration::from_millis(100),
        app.router.clone().oneshot(request),
    )
    .await;
    assert!(dropped.is_err());

    let current = wait_for_status(&app.router, &cookie, "complete").await;
    assert_eq!(current["status"], "complete");
    assert_eq!(current["topic"], "Estimated tax penalties");

    let (_, history) = send(&app.router, empty_request("GET", "/history", &cookie)).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn second_submission_and_load_wait_for_the_running_one() {
    let gate = Arc::new(Notify::new());
    let app = test_app_with(CannedModel {
        draft_gate: Some(gate.clone()),
        ..Default::default()
    })
    .await;
    let cookie = login(&app.router).await;

    let first = tokio::spawn(app.router.clone().oneshot(json_request(
        "POST",
        "/generations",
        Some(&cookie),
        submission("Roth conversions"),
    )));
    let current = wait_for_status(&app.router, &cookie, "thinking").await;
    assert_eq!(current["status"], "thinking");

    let (status, _) = send(
        &app.router,
        json_request("POST", "/generations", Some(&cookie), submission("Other topic")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app.router,
        empty_request("POST", "/history/any-id/load", &cookie),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    gate.notify_one();
    let response = first.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The flag is clear again: load now reaches the history lookup.
    let (status, _) = send(
        &app.router,
        empty_request("POST", "/history/any-id/load", &cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn image_failure_maps_to_bad_gateway() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/images",
            Some(&cookie),
            json!({ "prompt": "A calculator on a desk" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, Value::String("Failed to generate image.".to_string()));
}

//=========================================================================================
// History
//=========================================================================================

#[tokio::test]
async fn history_entries_load_and_delete() {
    let app = test_app(false).await;
    let cookie = login(&app.router).await;

    send(
        &app.router,
        json_request("POST", "/generations", Some(&cookie), submission("HSA limits")),
    )
    .await;
    let (_, history) = send(&app.router, empty_request("GET", "/history", &cookie)).await;
    let id = history[0]["id"].as_str().unwrap().to_string();

    let (status, loaded) = send(
        &app.router,
        empty_request("POST", &format!("/history/{}/load", id), &cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loaded["status"], "complete");
    assert_eq!(loaded["topic"], "HSA limits");

    let (status, _) = send(
        &app.router,
        empty_request("DELETE", &format!("/history/{}", id), &cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app.router,
        empty_request("DELETE", &format!("/history/{}", id), &cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        empty_request("GET", &format!("/history/{}", id), &cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
