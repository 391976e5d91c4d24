//! Integration tests for the gateway service over a real HTTP backend

use crate::domain::{ApiKey, SharedSecret};
use crate::gateway::headers::{content_types, CONTENT_TYPE, COOKIE, SET_COOKIE, X_REQUEST_ID};
use crate::gateway::service::GatewayService;
use crate::gateway::types::*;
use crate::signing::RequestSigner;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn gateway(backend: &ServerGuard) -> Router {
    let config = GatewayConfig::new(
        ApiKey::try_new("integration-key").unwrap(),
        SharedSecret::try_new(SECRET).unwrap(),
        BackendUrl::try_new(format!("{}/v2", backend.url())).unwrap(),
    )
    .with_proxy_backend(BackendUrl::try_new(format!("{}/files/", backend.url())).unwrap())
    .with_request_timeout(Duration::from_secs(5));

    GatewayService::from_config(config).into_router()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_api_login_round_trip() {
    let mut backend = Server::new_async().await;
    let mock = backend
        .mock("POST", "/v2")
        .match_header("content-type", content_types::APPLICATION_JSON_UTF8)
        .match_body(Matcher::PartialJson(json!({
            "method": "user.login",
            "key": "integration-key",
            "token": "none"
        })))
        .with_status(200)
        .with_body(r#"{"requested":"user.login","success":true,"data":{"sessionToken":"abc123"}}"#)
        .create_async()
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/json-api")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"method":"user.login","args":{"user":"ada"}}"#))
        .unwrap();

    let response = gateway(&backend).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(X_REQUEST_ID));
    assert_eq!(
        response.headers().get(SET_COOKIE).unwrap(),
        "parsonySession=abc123; HttpOnly"
    );
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["data"], json!({}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_request_signature_verifies_on_backend_side() {
    let mut backend = Server::new_async().await;
    let (tx, rx) = std::sync::mpsc::channel::<Vec<u8>>();
    let tx = std::sync::Mutex::new(tx);
    backend
        .mock("POST", "/v2")
        .with_status(200)
        .with_body_from_request(move |request| {
            let _ = tx.lock().unwrap().send(request.body().unwrap().clone());
            br#"{"success":true}"#.to_vec()
        })
        .create_async()
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/json-api")
        .header(COOKIE, "theme=dark; parsonySession=t0k")
        .body(Body::from(r#"{"method":"items.list"}"#))
        .unwrap();

    let response = gateway(&backend).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent: Map<String, Value> = serde_json::from_slice(&rx.recv().unwrap()).unwrap();
    assert_eq!(sent["token"], "t0k");
    assert!(RequestSigner::new(SharedSecret::try_new(SECRET).unwrap()).verify(&sent));
}

#[tokio::test]
async fn test_sms_webhook_form_post() {
    let mut backend = Server::new_async().await;
    backend
        .mock("POST", "/v2")
        .match_body(Matcher::PartialJson(json!({
            "method": "sms.webhook",
            "args": {"content": "hi there", "from": "+15550001111", "to": "+15552223333"}
        })))
        .with_status(200)
        .with_body(r#"{"data":{"twiml":"<Response></Response>"}}"#)
        .create_async()
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/sms")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "Body=hi+there&From=%2B15550001111&To=%2B15552223333",
        ))
        .unwrap();

    let response = gateway(&backend).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        content_types::TEXT_XML
    );
    assert_eq!(body_string(response).await, "<Response></Response>");
}

#[tokio::test]
async fn test_sms_webhook_json_post() {
    let mut backend = Server::new_async().await;
    let mock = backend
        .mock("POST", "/v2")
        .match_body(Matcher::PartialJson(json!({
            "method": "sms.webhook",
            "args": {"content": "hi", "from": "+15550001111", "to": "+15552223333"}
        })))
        .with_status(200)
        .with_body(r#"{"data":{"twiml":"<Response><Message>ok</Message></Response>"}}"#)
        .create_async()
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/sms")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"Body":"hi","From":"+15550001111","To":"+15552223333"}"#,
        ))
        .unwrap();

    let response = gateway(&backend).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        content_types::TEXT_XML
    );
    assert_eq!(
        body_string(response).await,
        "<Response><Message>ok</Message></Response>"
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_sms_webhook_odd_bodies_still_reach_backend() {
    let mut backend = Server::new_async().await;
    let mock = backend
        .mock("POST", "/v2")
        .match_body(Matcher::PartialJson(json!({"method": "sms.webhook"})))
        .with_status(200)
        .with_body(r#"{"data":{"twiml":"<Response/>"}}"#)
        .expect(3)
        .create_async()
        .await;
    let router = gateway(&backend);

    let bodies = [
        ("application/x-www-form-urlencoded", "Body=a&Body=b"),
        ("application/json", "{not json"),
        ("text/plain", "Body=hello"),
    ];
    for (content_type, body) in bodies {
        let request = Request::builder()
            .method("POST")
            .uri("/sms")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{content_type}: {body}");
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            content_types::TEXT_XML
        );
        assert_eq!(body_string(response).await, "<Response/>");
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_bare_prefix_targets_backend_root() {
    let mut backend = Server::new_async().await;
    let mock = backend
        .mock("POST", "/files/")
        .match_header("cookie", "parsonySession=t0k")
        .with_status(200)
        .with_body("<root/>")
        .expect(2)
        .create_async()
        .await;
    let router = gateway(&backend);

    for uri in ["/proxy", "/proxy/"] {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(COOKIE, "parsonySession=t0k")
            .body(Body::empty())
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(body_string(response).await, "<root/>");
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_forwards_path_and_query() {
    let mut backend = Server::new_async().await;
    let mock = backend
        .mock("POST", "/files/orders/42")
        .match_query(Matcher::UrlEncoded("expand".into(), "items".into()))
        .match_header("cookie", "parsonySession=t0k")
        .match_header("content-type", "text/plain")
        .match_body("payload")
        .with_status(200)
        .with_body("<order id=\"42\"/>")
        .create_async()
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/proxy/orders/42?expand=items")
        .header(COOKIE, "parsonySession=t0k; tracking=1")
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from("payload"))
        .unwrap();

    let response = gateway(&backend).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<order id=\"42\"/>");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proxy_get_is_not_routed() {
    let backend = Server::new_async().await;

    let request = Request::builder()
        .method("GET")
        .uri("/proxy/orders/42")
        .body(Body::empty())
        .unwrap();

    let response = gateway(&backend).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_check() {
    let backend = Server::new_async().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = gateway(&backend).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn test_static_files_fall_back_to_index() {
    let backend = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

    let config = GatewayConfig::new(
        ApiKey::try_new("integration-key").unwrap(),
        SharedSecret::try_new(SECRET).unwrap(),
        BackendUrl::try_new(format!("{}/v2", backend.url())).unwrap(),
    );
    let router = GatewayService::from_config(config)
        .with_static_files(dir.path())
        .into_router();

    let asset = Request::builder().uri("/app.js").body(Body::empty()).unwrap();
    let response = router.clone().oneshot(asset).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "console.log(1)");

    let client_route = Request::builder()
        .uri("/settings/profile")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(client_route).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<html>app</html>");
}

#[tokio::test]
async fn test_custom_endpoint_paths() {
    let mut backend = Server::new_async().await;
    backend
        .mock("POST", "/v2")
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let endpoints = EndpointPaths {
        api: EndpointPath::try_new("/api/v1").unwrap(),
        ..EndpointPaths::default()
    };
    let config = GatewayConfig::new(
        ApiKey::try_new("integration-key").unwrap(),
        SharedSecret::try_new(SECRET).unwrap(),
        BackendUrl::try_new(format!("{}/v2", backend.url())).unwrap(),
    )
    .with_endpoints(endpoints);
    let router = GatewayService::from_config(config).into_router();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1")
        .body(Body::from("{}"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("POST")
        .uri("/json-api")
        .body(Body::from("{}"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
