//! Integration tests for the REST API.
//!
//! Requests are driven in-process through the router with
//! `tower::ServiceExt::oneshot`.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use registry_core::{RegistryConfig, Runtime};
use registry_server::{create_server, AppState};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

struct TestApp {
    router: Router,
    runtime: Runtime,
}

impl TestApp {
    fn new() -> Self {
        Self::with_key(Some(API_KEY))
    }

    fn with_key(key: Option<&str>) -> Self {
        let mut runtime =
            Runtime::new(RegistryConfig::default().with_webhook_timeout(2)).unwrap();
        runtime.start().unwrap();

        let state = AppState::new(
            runtime.database(),
            key.map(|k| SecretString::new(k.to_string())),
        );
        Self {
            router: create_server(state),
            runtime,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY));
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.call(request.body(body).unwrap()).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    async fn create_software(&self, url: &str) -> String {
        let (status, body) = self
            .post(
                "/v1/software",
                json!({"url": url, "publiccodeYml": "publiccodeYmlVersion: \"0.2\""}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_status() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
}

#[tokio::test]
async fn test_software_crud() {
    let app = TestApp::new();
    let id = app.create_software("https://github.com/example/app").await;

    let (status, body) = app.get(&format!("/v1/software/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://github.com/example/app");
    assert_eq!(body["active"], true);

    let (status, body) = app
        .patch(&format!("/v1/software/{}", id), json!({"active": false}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);
    assert_eq!(body["url"], "https://github.com/example/app");

    let (_, body) = app.get("/v1/software").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&format!("/v1/software/{}", id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/v1/software/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["title"], "can't get Software");
    assert_eq!(body["detail"], "Software was not found");

    let db = app.runtime.database();
    assert_eq!(db.list_events_for("software", &id).unwrap().len(), 3);
}

#[tokio::test]
async fn test_software_url_conflict() {
    let app = TestApp::new();
    app.create_software("https://github.com/example/app").await;

    let (status, body) = app
        .post(
            "/v1/software",
            json!({"url": "https://github.com/example/app", "publiccodeYml": "name: dup"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["title"], "can't create Software");
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let app = TestApp::new();
    let request = Request::post("/v1/logs")
        .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["detail"], "invalid json");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_validation_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/v1/publishers",
            json!({"email": "not-an-email", "codeHosting": [{"url": "nope"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["title"], "can't create Publisher");
    assert_eq!(
        body["validationErrors"],
        json!([
            {"field": "codeHosting[0].url", "rule": "url"},
            {"field": "email", "rule": "email"},
        ])
    );

    let (status, body) = app.post("/v1/software", json!({"url": "https://x.org/a"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["detail"],
        "invalid format: publiccodeYml is required"
    );
}

#[tokio::test]
async fn test_publisher_requires_code_hosting() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/v1/publishers",
            json!({"email": "info@example.org", "codeHosting": []}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["validationErrors"],
        json!([{"field": "codeHosting", "rule": "required"}])
    );

    let (status, _) = app.get("/v1/publishers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.runtime.database().count_events().unwrap(), 0);
}

#[tokio::test]
async fn test_publishers() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/v1/publishers",
            json!({
                "email": "Info@Example.org",
                "description": "Comune di Esempio",
                "alternativeId": "c_x123",
                "codeHosting": [{"url": "https://github.com/example"}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["email"], "info@example.org");
    assert_eq!(body["codeHosting"][0]["group"], true);

    let (status, by_alt) = app.get("/v1/publishers/c_x123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_alt["id"], body["id"]);

    let (status, body) = app
        .post(
            "/v1/publishers",
            json!({"email": "info@example.org", "codeHosting": [{"url": "https://gitlab.com/x"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn test_logs() {
    let app = TestApp::new();
    let software = app.create_software("https://github.com/example/app").await;

    let (status, log) = app.post("/v1/logs", json!({"message": "crawler started"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            &format!("/v1/software/{}/logs", software),
            json!({"message": "indexed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&format!("/v1/software/{}/logs", software)).await;
    assert_eq!(body["data"][0]["message"], "indexed");
    assert_eq!(body["data"][0]["entityType"], "software");

    let (status, _) = app.get("/v1/software/nope/logs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let log_uri = format!("/v1/logs/{}", log["id"].as_str().unwrap());
    let (_, updated) = app.patch(&log_uri, json!({"message": "crawler finished"})).await;
    assert_eq!(updated["message"], "crawler finished");

    assert_eq!(app.delete(&log_uri).await.0, StatusCode::NO_CONTENT);
    assert_eq!(app.delete(&log_uri).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_management() {
    let app = TestApp::new();
    let software = app.create_software("https://github.com/example/app").await;

    let (status, global) = app
        .post(
            "/v1/software/webhooks",
            json!({"url": "http://hook.example/a", "secret": "xyz"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(global.get("secret").is_none());

    let (status, scoped) = app
        .post(
            &format!("/v1/software/{}/webhooks", software),
            json!({"url": "http://hook.example/b"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/v1/software/webhooks").await;
    assert_eq!(body["data"], json!([global.clone()]));
    let (_, body) = app.get(&format!("/v1/software/{}/webhooks", software)).await;
    assert_eq!(body["data"], json!([scoped.clone()]));
    let (_, body) = app.get("/v1/publishers/webhooks").await;
    assert_eq!(body["data"], json!([]));

    let hook_uri = format!("/v1/webhooks/{}", scoped["id"].as_str().unwrap());
    let (status, updated) = app
        .patch(&hook_uri, json!({"url": "http://hook.example/c"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["url"], "http://hook.example/c");

    assert_eq!(app.delete(&hook_uri).await.0, StatusCode::NO_CONTENT);
    let (status, body) = app.get(&hook_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Webhook was not found");
}

#[tokio::test]
async fn test_scoped_webhook_on_missing_resource() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/v1/publishers/missing/webhooks",
            json!({"url": "http://hook.example/a"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["title"], "can't find resource");
    assert_eq!(body["detail"], "resource was not found");
}

#[tokio::test]
async fn test_writes_require_api_key() {
    let app = TestApp::new();

    let unauthenticated = Request::post("/v1/logs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"message":"hello"}"#))
        .unwrap();
    let (status, body) = app.call(unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let wrong_key = Request::delete("/v1/logs/x")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.call(wrong_key).await.0, StatusCode::UNAUTHORIZED);

    let read = Request::get("/v1/logs").body(Body::empty()).unwrap();
    assert_eq!(app.call(read).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_read_only_without_api_key() {
    let app = TestApp::with_key(None);

    let (status, _) = app.post("/v1/logs", json!({"message": "hello"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/v1/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": []}));
}

#[tokio::test]
async fn test_software_create_notifies_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a"))
        .and(header_matcher("user-agent", "DevelopersItaliaAPI-Webhook/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/v1/software/webhooks",
            json!({"url": format!("{}/a", server.uri())}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let id = app.create_software("https://github.com/example/app").await;

    for _ in 0..200 {
        let received = server.received_requests().await.unwrap_or_default();
        if let Some(request) = received.first() {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            assert_eq!(
                body,
                json!({"event": "create", "subject": format!("/software/{}", id)})
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("webhook was not delivered");
}
