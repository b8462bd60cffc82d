//! Integration tests against a real server on an ephemeral port

use axum::http::StatusCode;
use permit_daemon::{ServerBuilder, Settings};
use permit_http::services::TokenSubject;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

/// Create test settings
fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.database.url = "sqlite::memory:".to_string();
    settings.auth.jwt.secret = Some("test-secret".to_string());
    settings.auth.jwt.issuer = "permit-test".to_string();
    settings
}

struct TestServer {
    base_url: String,
    admin_token: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Helper to start a test server
async fn start_test_server() -> Result<TestServer, anyhow::Error> {
    // Use port 0 to get a random available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    let (app, state) = ServerBuilder::connect(test_settings()).await?.build().await?;

    let roles = vec!["admin".to_string()];
    let admin_token = state.data.auth_service.issue_token(&TokenSubject {
        user_id: "ops",
        roles: &roles,
        ..Default::default()
    })?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Server failed to start");
    });

    Ok(TestServer {
        base_url: format!("http://{addr}"),
        admin_token,
        handle,
    })
}

#[tokio::test]
async fn test_server_starts_and_responds() {
    let server = start_test_server()
        .await
        .expect("Failed to start test server");
    let client = reqwest::Client::new();

    let response = timeout(
        Duration::from_secs(5),
        client.get(format!("{}/health", server.base_url)).send(),
    )
    .await
    .expect("Request timed out")
    .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_docs_are_public() {
    let server = start_test_server()
        .await
        .expect("Failed to start test server");

    let response = reqwest::get(format!("{}/docs", server.base_url))
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_registration_to_feature_access() {
    let server = start_test_server()
        .await
        .expect("Failed to start test server");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/register", server.base_url))
        .json(&json!({
            "company_name": "Northwind Clinic",
            "email": "owner@northwind.test",
            "owner_name": "Robin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    let company_id = body["company"]["id"].as_i64().unwrap();

    // Seeded General permissions are provisioned at registration
    let granted: Vec<&str> = body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(granted, vec!["manage-company", "dashboard-access"]);

    let feature = |path: &str| {
        client
            .get(format!("{}{path}", server.base_url))
            .bearer_auth(&token)
            .send()
    };

    let response = feature("/api/features/dashboard-access").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = feature("/api/features/view-analytics").await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Feature 'view-analytics' is not available for Northwind Clinic."
    );

    let response = client
        .post(format!(
            "{}/api/admin/company-access/{company_id}",
            server.base_url
        ))
        .bearer_auth(&server.admin_token)
        .json(&json!({"permission_name": "view-analytics", "enabled": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = feature("/api/features/view-analytics").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_api_rejects_company_tokens() {
    let server = start_test_server()
        .await
        .expect("Failed to start test server");
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/admin/categories", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let categories: Value = response.json().await.unwrap();
    assert_eq!(categories.as_array().unwrap().len(), 5);

    let response = client
        .get(format!("{}/api/admin/categories", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
