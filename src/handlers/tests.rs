//! # Tests for Handlers
//!
//! Router-level tests against a recording fake of the upstream adapter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use reqwest::Method;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::error::ERROR_CODE_HEADER;
use crate::server::{AppState, create_app};
use crate::telemetry::TRACE_ID_HEADER;
use crate::upstream::{ApiVersion, UpstreamApi, UpstreamError};

type Call = (Method, String, Option<Value>);

/// Records every forwarded call and answers with a canned result.
struct FakeUpstream {
    calls: Mutex<Vec<Call>>,
    reply: fn() -> Result<Value, UpstreamError>,
    configured: bool,
}

impl FakeUpstream {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: || Ok(json!({"data": []})),
            configured: true,
        })
    }

    fn failing(reply: fn() -> Result<Value, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply,
            configured: false,
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamApi for FakeUpstream {
    fn version(&self) -> ApiVersion {
        ApiVersion::V6
    }

    fn has_credentials(&self) -> bool {
        self.configured
    }

    async fn forward(
        &self,
        endpoint: &str,
        method: Method,
        payload: Option<Value>,
    ) -> Result<Value, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((method, endpoint.to_string(), payload));
        (self.reply)()
    }
}

fn app_with(config: AppConfig, upstream: Arc<FakeUpstream>) -> Router {
    create_app(AppState::new(Arc::new(config), upstream))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Response) {
    let response = app.oneshot(request).await.unwrap();
    (response.status(), response)
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_root_returns_service_info() {
    let (status, response) = send(app_with(AppConfig::default(), FakeUpstream::ok()), get("/")).await;
    assert_eq!(status, StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["service"], "verifyglobal");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_healthz_does_not_touch_upstream() {
    let upstream = FakeUpstream::ok();
    let (status, _) = send(app_with(AppConfig::default(), upstream.clone()), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_connections_without_customer_id_is_rejected_before_upstream() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, response) = send(app, get("/api/saltedge/connections")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert!(response.headers().contains_key(TRACE_ID_HEADER));
    assert_eq!(
        body_json(response).await,
        json!({"error": "customer_id is required"})
    );
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_connections_forwards_customer_filter() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, _) = send(app, get("/api/saltedge/connections?customer_id=c1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        upstream.calls(),
        vec![(Method::GET, "/connections?customer_id=c1".to_string(), None)]
    );
}

#[tokio::test]
async fn test_create_customer_requires_identifier() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, response) =
        send(app, post_json("/api/saltedge/customers", json!({"identifier": "  "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "identifier is required"})
    );
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_create_customer_forwards_identifier() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, _) = send(
        app,
        post_json("/api/saltedge/customers", json!({"identifier": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        upstream.calls(),
        vec![(
            Method::POST,
            "/customers".to_string(),
            Some(json!({"identifier": "x"}))
        )]
    );
}

#[tokio::test]
async fn test_malformed_request_json_is_400() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/saltedge/connect")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, response) = send(app_with(AppConfig::default(), FakeUpstream::ok()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(ERROR_CODE_HEADER).unwrap(),
        "VALIDATION_FAILED"
    );
}

#[tokio::test]
async fn test_connect_requires_customer_id() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, response) = send(
        app,
        post_json("/api/saltedge/connect", json!({"return_to": "https://app"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "customer_id is required"})
    );
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_connect_builds_v6_session_payload() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, _) = send(
        app,
        post_json(
            "/api/saltedge/connect",
            json!({"customer_id": "c1", "return_to": "https://app"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let calls = upstream.calls();
    assert_eq!(calls.len(), 1);
    let (method, endpoint, payload) = &calls[0];
    assert_eq!(*method, Method::POST);
    assert_eq!(endpoint, "/connections/connect");
    let payload = payload.as_ref().unwrap();
    assert_eq!(payload["customer_id"], "c1");
    assert_eq!(payload["attempt"]["return_to"], "https://app");
    assert_eq!(payload["consent"]["scopes"], json!(["accounts", "transactions"]));
}

#[tokio::test]
async fn test_accounts_and_transactions_pass_optional_filters() {
    let upstream = FakeUpstream::ok();

    let app = app_with(AppConfig::default(), upstream.clone());
    send(app, get("/api/saltedge/accounts")).await;
    let app = app_with(AppConfig::default(), upstream.clone());
    send(app, get("/api/saltedge/transactions?account_id=a1")).await;

    let endpoints: Vec<String> = upstream.calls().into_iter().map(|c| c.1).collect();
    assert_eq!(endpoints, vec!["/accounts", "/transactions?account_id=a1"]);
}

#[tokio::test]
async fn test_upstream_configuration_error_is_500_with_message() {
    let upstream = FakeUpstream::failing(|| {
        Err(UpstreamError::Configuration(
            "SERVER_CONFIG_ERROR: Missing SALTEDGE_APP_ID".to_string(),
        ))
    });
    let app = app_with(AppConfig::default(), upstream);

    let (status, response) = send(app, get("/api/saltedge/customers")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get(ERROR_CODE_HEADER).unwrap(),
        "CONFIGURATION_ERROR"
    );
    assert_eq!(
        body_json(response).await,
        json!({"error": "SERVER_CONFIG_ERROR: Missing SALTEDGE_APP_ID"})
    );
}

#[tokio::test]
async fn test_upstream_rejection_message_is_surfaced() {
    let upstream = FakeUpstream::failing(|| {
        Err(UpstreamError::Rejection {
            status: 401,
            message: "Invalid App-id".to_string(),
        })
    });
    let app = app_with(AppConfig::default(), upstream);

    let (status, response) = send(app, get("/api/saltedge/accounts")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "Invalid App-id"}));
}

#[tokio::test]
async fn test_status_masks_credentials() {
    let config = AppConfig {
        saltedge_app_id: Some("app-id-1234567890".to_string()),
        saltedge_secret: Some("short".to_string()),
        ..Default::default()
    };
    let (status, response) = send(app_with(config, FakeUpstream::ok()), get("/api/saltedge/status")).await;
    assert_eq!(status, StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["app_id"], true);
    assert_eq!(body["app_id_masked"], "app-...7890");
    assert_eq!(body["secret"], true);
    assert_eq!(body["secret_masked"], "****");
    assert_eq!(body["private_key"], false);
    assert_eq!(body["test_mode"], true);
    assert_eq!(body["api_version"], "v6");
    assert_eq!(body["mode"], "live");
    assert!(!body.to_string().contains("1234567890"));
}

#[tokio::test]
async fn test_passthrough_get_keeps_query() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, _) = send(app, get("/api/saltedge/providers/fake_bank?country_code=XF")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        upstream.calls(),
        vec![(
            Method::GET,
            "/providers/fake_bank?country_code=XF".to_string(),
            None
        )]
    );
}

#[tokio::test]
async fn test_passthrough_keeps_encoded_path_characters() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, _) = send(app, get("/api/saltedge/customers/a%3Fb%23c")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        upstream.calls(),
        vec![(Method::GET, "/customers/a%3Fb%23c".to_string(), None)]
    );
}

#[tokio::test]
async fn test_passthrough_rejects_dot_segments() {
    let upstream = FakeUpstream::ok();

    for uri in [
        "/api/saltedge/x%2F..%2F..%2F..%2Fadmin",
        "/api/saltedge/x/../admin",
        "/api/saltedge/x/%2e%2E/admin",
    ] {
        let app = app_with(AppConfig::default(), upstream.clone());
        let (status, response) = send(app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            body_json(response).await,
            json!({"error": "path must not contain dot segments"})
        );
    }

    let app = app_with(AppConfig::default(), upstream.clone());
    let (status, _) = send(app, post_json("/api/saltedge/x/../leads", json!({"a": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_passthrough_post_forwards_body() {
    let upstream = FakeUpstream::ok();
    let app = app_with(AppConfig::default(), upstream.clone());

    let (status, _) = send(
        app,
        post_json("/api/saltedge/leads", json!({"email": "a@b.c"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        upstream.calls(),
        vec![(
            Method::POST,
            "/leads".to_string(),
            Some(json!({"email": "a@b.c"}))
        )]
    );
}

#[tokio::test]
async fn test_openapi_document_lists_proxy_routes() {
    let (status, response) = send(
        app_with(AppConfig::default(), FakeUpstream::ok()),
        get("/openapi.json"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["paths"]["/api/saltedge/connections"].is_object());
    assert!(body["paths"]["/api/saltedge/status"].is_object());
}
