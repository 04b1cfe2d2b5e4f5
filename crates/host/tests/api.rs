mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{session_with, MockExecutor};
use okd_deployer_host::api::{app, AppState};
use okd_deployer_host::cluster::CommandOutput;
use serde_json::{json, Value};
use tower::ServiceExt;

const API_TOKEN: &str = "deployer-api-token";

fn router(executor: &Arc<MockExecutor>, api_token: Option<&str>) -> Router {
    let session = Arc::new(session_with(executor));
    app(
        AppState::new(session, api_token.map(ToString::to_string)),
        None,
    )
}

fn demo_request() -> Value {
    json!({
        "namespace": "demo",
        "containerImage": "nginx:latest",
        "cpuRequest": "100m",
        "memoryRequest": "128Mi",
        "containerPort": "8080",
        "exposeRoute": false,
        "storageRequired": false
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_is_public() {
    let executor = Arc::new(MockExecutor::new());
    let (status, body) = send(router(&executor, Some(API_TOKEN)), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn generate_renders_yaml() {
    let executor = Arc::new(MockExecutor::new());
    let (status, body) = send(
        router(&executor, None),
        post_json("/api/generate", &demo_request()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let yaml = body["yaml"].as_str().unwrap();
    assert!(yaml.contains("name: demo-deployment"));
    assert!(yaml.contains("name: demo-service"));
    assert!(!yaml.contains("kind: Namespace"));
    assert_eq!(executor.login_calls(), 0);
}

#[tokio::test]
async fn generate_rejects_invalid_namespace() {
    let executor = Arc::new(MockExecutor::new());
    let mut request = demo_request();
    request["namespace"] = json!("Invalid_NS");

    let (status, body) = send(router(&executor, None), post_json("/api/generate", &request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("Invalid_NS"));
}

#[tokio::test]
async fn malformed_body_uses_error_shape() {
    let executor = Arc::new(MockExecutor::new());
    let mut request = demo_request();
    request["containerPort"] = json!("http");

    let (status, body) = send(router(&executor, None), post_json("/api/generate", &request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("containerPort"));

    let unparsable = Request::builder()
        .method("POST")
        .uri("/api/deploy")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(router(&executor, None), unparsable).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(executor.login_calls(), 0);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let executor = Arc::new(MockExecutor::new());

    let (status, body) = send(router(&executor, Some(API_TOKEN)), get("/api/auth/status")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");

    let request = Request::builder()
        .uri("/api/auth/status")
        .header(header::AUTHORIZATION, "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(router(&executor, Some(API_TOKEN)), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/auth/status")
        .header(header::AUTHORIZATION, format!("Bearer {API_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(&executor, Some(API_TOKEN)), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn namespaces_endpoint_lists_user_namespaces() {
    let executor = Arc::new(MockExecutor::new());
    let (status, body) = send(router(&executor, None), get("/api/namespaces")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["namespaces"][0]["name"], "team-a");
    assert_eq!(body["namespaces"][0]["status"], "Active");
    assert_eq!(body["namespaces"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn storage_classes_endpoint_honors_refresh() {
    let executor = Arc::new(MockExecutor::new());
    let app = router(&executor, None);

    let (status, body) = send(app.clone(), get("/api/storage-classes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storageClasses"][0]["isDefault"], true);

    send(app.clone(), get("/api/storage-classes")).await;
    assert_eq!(executor.list_calls(), 1);

    send(app, get("/api/storage-classes?refresh=true")).await;
    assert_eq!(executor.list_calls(), 2);
}

#[tokio::test]
async fn deploy_applies_rendered_manifests() {
    let executor = Arc::new(MockExecutor::new());
    let (status, body) = send(router(&executor, None), post_json("/api/deploy", &demo_request())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body["output"].as_str().unwrap().contains("created"));

    let applied = executor.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].1, body["yaml"].as_str().unwrap());
}

#[tokio::test]
async fn deploy_reports_cluster_failure() {
    let executor = Arc::new(MockExecutor::new().with_login(CommandOutput::failure(1, "Unauthorized")));
    let (status, body) = send(router(&executor, None), post_json("/api/deploy", &demo_request())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("Unauthorized"));
    assert_eq!(executor.apply_calls(), 0);
}

#[tokio::test]
async fn login_endpoint_authenticates() {
    let executor = Arc::new(MockExecutor::new());
    let app = router(&executor, None);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);

    let (_, body) = send(app, get("/api/auth/status")).await;
    assert_eq!(body["authenticated"], true);
    assert!(body["authenticatedAt"].is_string());
}
