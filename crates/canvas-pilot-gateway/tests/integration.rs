//! Gateway integration tests: start a real gateway with stub providers and
//! talk to it over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use canvas_pilot_core::config::Config;
use canvas_pilot_core::{CanvasCommand, DebugInfo};
use canvas_pilot_gateway::GatewayState;
use canvas_pilot_providers::image::ImageGenerator;
use canvas_pilot_providers::replicate::ReplicateClient;
use canvas_pilot_providers::{CanvasProvider, CanvasRequest, CanvasResult, ProviderError};

/// Provider that answers from a script and remembers the last request.
struct StubProvider {
    id: &'static str,
    fail: bool,
    last: Mutex<Option<CanvasRequest>>,
}

impl StubProvider {
    fn new(id: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            fail,
            last: Mutex::new(None),
        })
    }

    fn last(&self) -> Option<CanvasRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl CanvasProvider for StubProvider {
    fn id(&self) -> &str {
        self.id
    }

    async fn invoke(&self, request: &CanvasRequest) -> Result<CanvasResult, ProviderError> {
        *self.last.lock().unwrap() = Some(request.clone());
        if self.fail {
            return Err(ProviderError::MissingCredential("OpenAI API key"));
        }
        let command = CanvasCommand::from_value(json!({
            "action": "create", "type": "rectangle",
            "x": 0, "y": 0, "width": 10, "height": 10, "fill": "#FF0000"
        }))
        .unwrap();
        Ok(CanvasResult {
            commands: vec![command],
            debug: DebugInfo {
                provider: Some(self.id.into()),
                ..Default::default()
            },
        })
    }
}

struct TestGateway {
    base: String,
    direct: Arc<StubProvider>,
    proxied: Arc<StubProvider>,
}

async fn start_test_gateway(proxied_fails: bool) -> TestGateway {
    let direct = StubProvider::new("openai", false);
    let proxied = StubProvider::new("replicate", proxied_fails);

    // Nothing listens on port 9; image tests only exercise paths that fail
    // before any network call.
    let replicate = ReplicateClient::new(
        reqwest::Client::new(),
        None,
        Some("http://127.0.0.1:9"),
        Duration::from_secs(1),
        Duration::from_millis(10),
    );
    let state = Arc::new(GatewayState::new(
        Arc::new(Config::default()),
        direct.clone(),
        proxied.clone(),
        Arc::new(ImageGenerator::new(Arc::new(replicate))),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let _ = canvas_pilot_gateway::serve(listener, state).await;
    });

    TestGateway {
        base,
        direct,
        proxied,
    }
}

async fn post_json(url: &str, body: Value) -> (u16, Value, reqwest::header::HeaderMap) {
    let resp = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("request failed");
    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let body = resp.json().await.unwrap();
    (status, body, headers)
}

#[tokio::test]
async fn test_health_endpoint() {
    let gw = start_test_gateway(false).await;
    let resp = reqwest::get(format!("{}/health", gw.base)).await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_hello_get_and_post() {
    let gw = start_test_gateway(false).await;
    let resp = reqwest::get(format!("{}/hello", gw.base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"hello": "world"}));

    let (status, body, _) = post_json(&format!("{}/hello", gw.base), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["hello"], "world");
}

#[tokio::test]
async fn test_preflight_short_circuits() {
    let gw = start_test_gateway(false).await;
    let resp = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/ai-text-to-canvas", gw.base),
        )
        .body("this is not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    let headers = resp.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type, Authorization"
    );
    assert!(gw.direct.last().is_none());
}

#[tokio::test]
async fn test_non_post_is_rejected() {
    let gw = start_test_gateway(false).await;
    let resp = reqwest::get(format!("{}/ai-text-to-canvas", gw.base))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "Method not allowed"}));
}

#[tokio::test]
async fn test_validation_failures() {
    let gw = start_test_gateway(false).await;
    let url = format!("{}/ai-text-to-canvas", gw.base);

    let (status, body, headers) = post_json(&url, json!({"model": "gpt-5"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing prompt in request body");
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");

    let (status, body, _) = post_json(&url, json!({"prompt": "  "})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Prompt cannot be empty");

    let (status, body, _) = post_json(&url, json!({"prompt": "a".repeat(2001)})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Prompt too long (max 2000 characters)");

    let resp = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body("{broken")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request: "));
    assert_eq!(body["success"], false);

    assert!(gw.direct.last().is_none());
}

#[tokio::test]
async fn test_direct_success_uses_default_model() {
    let gw = start_test_gateway(false).await;
    let (status, body, _) = post_json(
        &format!("{}/ai-text-to-canvas", gw.base),
        json!({"prompt": "a red square"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["commands"][0]["type"], "rectangle");
    assert_eq!(body["debug"]["provider"], "openai");
    assert!(body.get("error").is_none());

    let request = gw.direct.last().unwrap();
    assert_eq!(request.model, "gpt-5-mini");
    assert!(request.selected_content.is_none());
}

#[tokio::test]
async fn test_replicate_receives_selection() {
    let gw = start_test_gateway(false).await;
    let (status, _, _) = post_json(
        &format!("{}/ai-text-to-canvas-replicate", gw.base),
        json!({
            "prompt": "make it blue",
            "model": "gpt-5",
            "selectedContent": {"id": "rect-1", "fill": "#FF0000"}
        }),
    )
    .await;
    assert_eq!(status, 200);

    let request = gw.proxied.last().unwrap();
    assert_eq!(request.model, "gpt-5");
    assert_eq!(request.selected_content.unwrap().0["id"], "rect-1");
    assert!(gw.direct.last().is_none());
}

#[tokio::test]
async fn test_provider_failure_is_500() {
    let gw = start_test_gateway(true).await;
    let (status, body, _) = post_json(
        &format!("{}/ai-text-to-canvas-replicate", gw.base),
        json!({"prompt": "anything"}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(
        body,
        json!({"success": false, "error": "OpenAI API key not configured"})
    );
}

#[tokio::test]
async fn test_image_unknown_model() {
    let gw = start_test_gateway(false).await;
    let (status, body, _) = post_json(
        &format!("{}/ai-generate-image", gw.base),
        json!({"prompt": "a cat", "model": "unknown-model"}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Unknown model: unknown-model");
}

#[tokio::test]
async fn test_image_missing_token() {
    let gw = start_test_gateway(false).await;
    let (status, body, _) = post_json(
        &format!("{}/ai-generate-image", gw.base),
        json!({"prompt": "a cat"}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Replicate API token not configured");
}
