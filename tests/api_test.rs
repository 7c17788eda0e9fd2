//! HTTP tests: the full router over SQLite and a mock GPU provider.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use gpu_portal::api::create_router;

struct TestApp {
    harness: Harness,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let harness = Harness::new().await;
        let router = create_router(harness.app_state(), &harness.config.cors_origins);
        Self { harness, router }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(&self.harness.config.seed_admin_username, ADMIN_PASSWORD)
            .await
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["users"], 1);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app
        .send(Method::GET, "/api/portal/status", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "admin", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_admin_provisions_user_who_starts_instance() {
    let app = TestApp::new().await;
    mount_listing(&app.harness.server, &[(42, "X", STOPPED)]).await;
    mount_action(&app.harness.server, 1).await;
    let admin = app.admin_token().await;

    let (status, instance) = app
        .send(
            Method::POST,
            "/api/instances",
            Some(&admin),
            Some(json!({
                "instance_uuid": "X",
                "nickname": "Y",
                "target_url": "https://lab.example.com"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{instance}");
    assert_eq!(instance["instance_id"], 42);

    let (status, bob) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({
                "username": "bob",
                "password": USER_PASSWORD,
                "gpu_instance_id": instance["id"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{bob}");
    assert_eq!(bob["instance_id"], 42);
    assert_eq!(bob["target_url"], "https://lab.example.com");
    assert!(bob.get("hashed_password").is_none());

    let (_, available) = app
        .send(Method::GET, "/api/instances/available", Some(&admin), None)
        .await;
    assert_eq!(available, json!([]));

    let token = app.login("bob", USER_PASSWORD).await;
    let (status, me) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "bob");

    let (status, outcome) = app
        .send(
            Method::POST,
            "/api/portal/action",
            Some(&token),
            Some(json!({"action": "start"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{outcome}");
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["state"], "active");
    assert_eq!(outcome["target_url"], "https://lab.example.com");

    let (status, ack) = app
        .send(Method::POST, "/api/portal/heartbeat", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ack["last_heartbeat"].is_string());

    let (status, target) = app
        .send(Method::GET, "/api/portal/target-url", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(target["state"], "active");
}

#[tokio::test]
async fn test_regular_user_cannot_manage_users() {
    let app = TestApp::new().await;
    app.harness.create_user("nina", None).await;
    let token = app.login("nina", USER_PASSWORD).await;

    let (status, body) = app.send(Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = app.send(Method::GET, "/api/instances", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_action_without_instance_is_bad_request() {
    let app = TestApp::new().await;
    app.harness.create_user("oscar", None).await;
    let token = app.login("oscar", USER_PASSWORD).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/portal/action",
            Some(&token),
            Some(json!({"action": "start"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/portal/action",
            Some(&token),
            Some(json!({"action": "reboot"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_user_validation_and_duplicates() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({"username": "pat", "password": "short"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({"username": "pat", "password": USER_PASSWORD, "phone": "call me"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({"username": "pat", "password": USER_PASSWORD, "email": "pat@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({"username": "pat2", "password": USER_PASSWORD, "email": "pat@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "Email already exists");

    let (_, count) = app.send(Method::GET, "/api/users/count", Some(&admin), None).await;
    assert_eq!(count["count"], 1);
    assert_eq!(count["max"], 15);
}

#[tokio::test]
async fn test_user_cap_enforced() {
    let mut config = test_config();
    config.max_users_per_admin = 1;
    let harness = Harness::with_config(config).await;
    let router = create_router(harness.app_state(), &harness.config.cors_origins);
    let app = TestApp { harness, router };
    let admin = app.admin_token().await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({"username": "quinn", "password": USER_PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({"username": "rita", "password": USER_PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("User limit reached"));
}

#[tokio::test]
async fn test_delete_user_then_instance() {
    let app = TestApp::new().await;
    mount_listing(&app.harness.server, &[(42, "X", STOPPED)]).await;
    let admin = app.admin_token().await;

    let instance = app.harness.register("X", "Y").await;
    let sam = app.harness.create_user("sam", Some(instance.id)).await;

    let uri = format!("/api/instances/{}", instance.id);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/users/{}", sam.id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let uri = format!("/api/users/{}", app.harness.admin.id);

    let (status, body) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Cannot delete yourself");
}

#[tokio::test]
async fn test_browse_vendor_paginates() {
    let app = TestApp::new().await;
    mount_listing(&app.harness.server, &[(1, "u-1", RUNNING), (2, "u-2", STOPPED)]).await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .send(Method::GET, "/api/instances/vendor?page=1&per_page=10", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["total"], 2);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "GPU Portal");
}
