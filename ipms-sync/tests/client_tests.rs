mod common;

use common::{mock_config, paper, signed_in, signed_out, TOKEN};
use ipms_sync::{DataUrl, EntityKind, RemoteApi, RemoteClient, SyncConfig, SyncError};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Login ───────────────────────────────────────────────────────

#[tokio::test]
async fn login_returns_token_and_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": "admin", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t1", "username": "Admin"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();

    let resp = client.login("admin", "pw").await.unwrap();
    assert_eq!(resp.token, "t1");
    assert_eq!(resp.identity, "Admin");
}

#[tokio::test]
async fn login_falls_back_to_submitted_username() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t1"})))
        .mount(&server)
        .await;

    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    assert_eq!(client.login("admin", "pw").await.unwrap().identity, "admin");
}

#[tokio::test]
async fn login_failure_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid password"})))
        .mount(&server)
        .await;

    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();

    match client.login("admin", "bad").await {
        Err(SyncError::Auth(msg)) => assert_eq!(msg, "Invalid password"),
        other => panic!("expected Auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn login_failure_without_body_has_default_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    let err = client.login("admin", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "authentication error: login failed");
}

#[tokio::test]
async fn login_network_failure_is_network_error() {
    let (_, session) = signed_out();
    // Nothing listens on port 9 (discard) on test machines.
    let client = RemoteClient::new(SyncConfig::with_base_url("http://127.0.0.1:9"), session).unwrap();
    assert!(matches!(
        client.login("admin", "pw").await,
        Err(SyncError::Network(_))
    ));
}

// ── Logout / password / check ───────────────────────────────────

#[tokio::test]
async fn logout_sends_bearer_and_ignores_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    client.logout().await;
}

#[tokio::test]
async fn logout_without_session_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    client.logout().await;
}

#[tokio::test]
async fn change_password_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/password"))
        .and(bearer_token(TOKEN))
        .and(body_json(json!({"old_password": "a", "new_password": "b"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    client.change_password("a", "b").await.unwrap();
}

#[tokio::test]
async fn change_password_rejection_is_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/password"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid old password"})),
        )
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    match client.change_password("wrong", "b").await {
        Err(SyncError::Validation(msg)) => assert_eq!(msg, "Invalid old password"),
        other => panic!("expected Validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn change_password_requires_session() {
    let server = MockServer::start().await;
    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    assert!(matches!(
        client.change_password("a", "b").await,
        Err(SyncError::AuthRequired)
    ));
}

#[tokio::test]
async fn check_reports_liveness() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/check"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    assert!(client.check().await.unwrap());
}

#[tokio::test]
async fn check_reports_dead_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/check"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    assert!(!client.check().await.unwrap());
}

// ── fetch_list ──────────────────────────────────────────────────

#[tokio::test]
async fn fetch_list_returns_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/papers"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "A", "journal": "J", "authors": "X"},
            {"id": 2, "title": "B", "journal": "J", "authors": "Y"}
        ])))
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    let records = client.fetch_list(EntityKind::Papers).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get_str("title"), Some("B"));
}

#[tokio::test]
async fn fetch_list_401_clears_session_and_returns_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patents"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
        .mount(&server)
        .await;

    let (store, session) = signed_in();
    store.write("ipms_patents", "[]");
    let client = RemoteClient::new(mock_config(&server), session.clone()).unwrap();

    assert!(client.fetch_list(EntityKind::Patents).await.is_empty());
    assert!(!session.is_authenticated());
    assert!(store.is_empty());
}

#[tokio::test]
async fn fetch_list_server_error_returns_empty_and_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/copyrights"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session.clone()).unwrap();
    assert!(client.fetch_list(EntityKind::Copyrights).await.is_empty());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn fetch_list_non_array_body_returns_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/papers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    assert!(client.fetch_list(EntityKind::Papers).await.is_empty());
}

#[tokio::test]
async fn fetch_list_without_session_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    assert!(client.fetch_list(EntityKind::Papers).await.is_empty());
    assert!(client.fetch_list(EntityKind::Unknown).await.is_empty());
}

// ── push_list ───────────────────────────────────────────────────

#[tokio::test]
async fn push_list_posts_whole_list() {
    let server = MockServer::start().await;
    let records = vec![paper("A"), paper("B")];
    Mock::given(method("POST"))
        .and(path("/api/papers"))
        .and(bearer_token(TOKEN))
        .and(body_json(serde_json::to_value(&records).unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    client.push_list(EntityKind::Papers, &records).await;
}

#[tokio::test]
async fn push_list_failure_is_swallowed_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/patents"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session.clone()).unwrap();
    client.push_list(EntityKind::Patents, &[]).await;
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn push_list_without_session_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (_, session) = signed_out();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    client.push_list(EntityKind::Papers, &[paper("A")]).await;
}

// ── upload_binary ───────────────────────────────────────────────

#[tokio::test]
async fn upload_returns_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(bearer_token(TOKEN))
        .and(header_exists("content-type"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"upload.pdf\""))
        .and(body_string_contains("hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "/uploads/abc.pdf"})))
        .expect(1)
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    let payload = DataUrl::parse("data:application/pdf;base64,aGVsbG8=").unwrap();
    assert_eq!(
        client.upload_binary(payload).await.as_deref(),
        Some("/uploads/abc.pdf")
    );
}

#[tokio::test]
async fn upload_failure_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    let payload = DataUrl::new("image/png", vec![1, 2, 3]);
    assert_eq!(client.upload_binary(payload).await, None);
}

#[tokio::test]
async fn upload_without_url_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (_, session) = signed_in();
    let client = RemoteClient::new(mock_config(&server), session).unwrap();
    assert_eq!(
        client.upload_binary(DataUrl::new("image/png", vec![1])).await,
        None
    );
}
