use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use taskgate_api::config::ApiConfig;
use taskgate_auth::{DenyReason, InMemoryAuditLog};

const JWT_SECRET: &str = "black-box-secret-at-least-32-bytes!";

struct TestServer {
    base_url: String,
    audit: Arc<InMemoryAuditLog>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod (in-memory stores), bound to an ephemeral port.
        let audit = Arc::new(InMemoryAuditLog::new());
        let app = taskgate_api::app::build_app_with_audit(&ApiConfig::for_tests(JWT_SECRET), audit.clone())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            audit,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register `email` and return `(user id, access token)`.
    async fn register(&self, email: &str) -> (String, String) {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": "correct-horse" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_task(&self, token: &str, body: Value) -> Value {
        let res = self
            .client
            .post(self.url("/tasks"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: &str, issued_at: i64, expires_at: i64) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("primary".to_string());
    jsonwebtoken::encode(
        &header,
        &json!({ "sub": sub, "iat": issued_at, "exp": expires_at }),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn error_body(res: reqwest::Response) -> Value {
    let body: Value = res.json().await.unwrap();
    assert!(body["error"]["type"].is_string());
    assert!(body["error"]["status_code"].is_u64());
    body
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    for path in ["/", "/health"] {
        let res = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert!(body["version"].is_string());
    }
}

#[tokio::test]
async fn protected_endpoints_require_a_credential() {
    let srv = TestServer::spawn().await;

    for path in ["/whoami", "/tasks"] {
        let res = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()["www-authenticate"], "Bearer");
        let body = error_body(res).await;
        assert_eq!(body["error"]["message"], "authentication required");
    }

    let reasons: Vec<_> = srv.audit.entries().iter().map(|d| d.reason).collect();
    assert_eq!(reasons, vec![DenyReason::TokenMissing, DenyReason::TokenMissing]);
}

#[tokio::test]
async fn register_login_and_whoami() {
    let srv = TestServer::spawn().await;
    let (user_id, _) = srv.register("Carol@Example.com").await;

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "carol@example.com", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap();

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["principal_id"], user_id.as_str());
    assert_eq!(body["email"], "carol@example.com");
}

#[tokio::test]
async fn duplicate_registration_and_bad_login_are_rejected() {
    let srv = TestServer::spawn().await;
    srv.register("dave@example.com").await;

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "dave@example.com", "password": "another-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(res).await["error"]["message"], "email already registered");

    for (email, password) in [("dave@example.com", "wrong-pass"), ("nobody@example.com", "correct-horse")] {
        let res = srv
            .client
            .post(srv.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_body(res).await["error"]["message"], "incorrect email or password");
    }

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "eve@example.com", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn task_lifecycle_for_the_owner() {
    let srv = TestServer::spawn().await;
    let (user_id, token) = srv.register("alice@example.com").await;

    let created = srv
        .create_task(&token, json!({ "title": "  Buy <milk>  ", "description": "2 litres" }))
        .await;
    assert_eq!(created["user_id"], user_id.as_str());
    assert_eq!(created["title"], "Buy &lt;milk&gt;");
    assert_eq!(created["is_completed"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let res = srv
        .client
        .put(srv.url(&format!("/tasks/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "is_completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["is_completed"], true);
    assert_eq!(updated["title"], "Buy &lt;milk&gt;");

    let res = srv
        .client
        .get(srv.url("/tasks"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let listed: Value = res.json().await.unwrap();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["tasks"][0]["id"], id.as_str());

    let res = srv
        .client
        .delete(srv.url(&format!("/tasks/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .client
        .get(srv.url(&format!("/tasks/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cross_user_access_is_forbidden() {
    let srv = TestServer::spawn().await;
    let (alice_id, alice) = srv.register("alice@example.com").await;
    let (_, bob) = srv.register("bob@example.com").await;

    let task = srv.create_task(&alice, json!({ "title": "private" })).await;
    let path = format!("/tasks/{}", task["id"].as_str().unwrap());

    let res = srv.client.get(srv.url(&path)).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_body(res).await["error"]["message"], "not authorized to access this resource");

    let res = srv
        .client
        .put(srv.url(&path))
        .bearer_auth(&bob)
        .json(&json!({ "title": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.client.delete(srv.url(&path)).bearer_auth(&bob).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.client.get(srv.url("/tasks")).bearer_auth(&bob).send().await.unwrap();
    let listed: Value = res.json().await.unwrap();
    assert_eq!(listed["total"], 0);

    let res = srv.client.get(srv.url(&path)).bearer_auth(&alice).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["title"], "private");
    assert_eq!(body["user_id"], alice_id.as_str());

    let reasons: Vec<_> = srv.audit.entries().iter().map(|d| d.reason).collect();
    assert_eq!(reasons, vec![DenyReason::OwnershipMismatch; 3]);
}

#[tokio::test]
async fn client_supplied_owner_is_ignored() {
    let srv = TestServer::spawn().await;
    let (alice_id, alice) = srv.register("alice@example.com").await;
    let (bob_id, _) = srv.register("bob@example.com").await;

    let task = srv
        .create_task(
            &alice,
            json!({ "title": "spoof", "user_id": bob_id, "owner_id": bob_id }),
        )
        .await;
    assert_eq!(task["user_id"], alice_id.as_str());
}

#[tokio::test]
async fn unknown_and_unparseable_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.register("alice@example.com").await;

    for id in ["00000000-0000-7000-8000-000000000000", "not-a-uuid"] {
        let res = srv
            .client
            .get(srv.url(&format!("/tasks/{id}")))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_body(res).await["error"]["type"], "not_found");
    }

    // Unauthenticated callers learn nothing about ids.
    let res = srv.client.get(srv.url("/tasks/not-a-uuid")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_share_one_response() {
    let srv = TestServer::spawn().await;
    let (user_id, token) = srv.register("alice@example.com").await;
    let now = Utc::now();

    let expired = mint_jwt(
        JWT_SECRET,
        &user_id,
        (now - ChronoDuration::hours(2)).timestamp(),
        (now - ChronoDuration::hours(1)).timestamp(),
    );
    let foreign = mint_jwt(
        "some-other-secret-at-least-32-bytes",
        &user_id,
        now.timestamp(),
        (now + ChronoDuration::hours(1)).timestamp(),
    );
    let mut tampered = token.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let mut bodies = Vec::new();
    for bad in [expired, foreign, tampered, "garbage".to_string()] {
        let res = srv
            .client
            .get(srv.url("/tasks"))
            .bearer_auth(&bad)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        bodies.push(error_body(res).await);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(bodies[0]["error"]["message"], "invalid or expired credential");

    let reasons: Vec<_> = srv.audit.entries().iter().map(|d| d.reason).collect();
    assert_eq!(
        reasons,
        vec![
            DenyReason::TokenExpired,
            DenyReason::SignatureInvalid,
            DenyReason::SignatureInvalid,
            DenyReason::TokenMalformed,
        ]
    );
}

#[tokio::test]
async fn externally_minted_token_is_accepted() {
    let srv = TestServer::spawn().await;
    let (user_id, _) = srv.register("alice@example.com").await;
    let now = Utc::now();
    let token = mint_jwt(
        JWT_SECRET,
        &user_id,
        now.timestamp(),
        (now + ChronoDuration::minutes(10)).timestamp(),
    );

    let res = srv.client.get(srv.url("/whoami")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_task_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.register("alice@example.com").await;

    let long_title = "x".repeat(256);
    for body in [json!({ "title": "   " }), json!({ "title": long_title }), json!({ "description": "no title" })] {
        let res = srv
            .client
            .post(srv.url("/tasks"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(error_body(res).await["error"]["type"], "validation_error");
    }
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin_only() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .request(reqwest::Method::OPTIONS, srv.url("/tasks"))
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization,content-type")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert_eq!(res.headers()["access-control-allow-origin"], "http://localhost:3000");
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");
    let methods = res.headers()["access-control-allow-methods"].to_str().unwrap().to_string();
    assert!(methods.contains("POST"));

    let res = srv
        .client
        .request(reqwest::Method::OPTIONS, srv.url("/tasks"))
        .header("origin", "https://evil.example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();
    assert!(res.headers().get("access-control-allow-origin").is_none());

    // Simple requests carry the header too.
    let res = srv
        .client
        .get(srv.url("/health"))
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "http://localhost:3000");

    assert!(srv.audit.is_empty());
}
