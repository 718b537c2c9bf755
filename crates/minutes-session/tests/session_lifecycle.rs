//! Session lifecycle tests against a mock backend.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use minutes_api::ApiClient;
use minutes_core::{MinutesError, Result as CoreResult};
use minutes_session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionError, SessionManager,
    SessionStatus,
};

// =============================================================================
// Helpers
// =============================================================================

fn manager(server: &MockServer, store: Arc<dyn CredentialStore>) -> SessionManager {
    SessionManager::new(ApiClient::new(&server.uri()).unwrap(), store)
}

async fn mount_me(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "email": "a@b.com",
            "is_active": true,
            "created_at": "2024-05-01T09:30:00"
        })))
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": token, "token_type": "bearer"})),
        )
        .mount(server)
        .await;
}

/// A store whose `clear` always fails.
struct StuckStore;

impl CredentialStore for StuckStore {
    fn load(&self) -> CoreResult<Option<String>> {
        Ok(None)
    }
    fn save(&self, _credential: &str) -> CoreResult<()> {
        Ok(())
    }
    fn clear(&self) -> CoreResult<()> {
        Err(MinutesError::Storage("disk is read-only".to_string()))
    }
}

// =============================================================================
// initialize
// =============================================================================

#[tokio::test]
async fn initialize_with_rejected_credential_ends_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Could not validate credentials"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credential("expired"));
    let session = manager(&server, store.clone());
    session.initialize().await;

    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert!(session.identity().is_none());
    assert!(session.credential().is_none());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn initialize_with_server_error_ends_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credential("t1"));
    let session = manager(&server, store.clone());
    session.initialize().await;

    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn initialize_with_unreachable_server_ends_anonymous() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let store = Arc::new(MemoryCredentialStore::with_credential("t1"));
    let api = ApiClient::new(&format!("http://127.0.0.1:{}", port)).unwrap();
    let session = SessionManager::new(api, store.clone());
    session.initialize().await;

    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn initialize_with_valid_credential_restores_identity() {
    let server = MockServer::start().await;
    mount_me(&server, "t1").await;

    let store = Arc::new(MemoryCredentialStore::with_credential("t1"));
    let session = manager(&server, store.clone());
    session.initialize().await;

    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert_eq!(session.identity().unwrap().email, "a@b.com");
    assert_eq!(session.credential().as_deref(), Some("t1"));
    assert_eq!(store.load().unwrap(), Some("t1".to_string()));
}

#[tokio::test]
async fn initialize_without_credential_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    session.initialize().await;
    assert_eq!(session.status(), SessionStatus::Anonymous);
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_persists_credential_and_authenticates() {
    let server = MockServer::start().await;
    mount_login(&server, "t1").await;
    mount_me(&server, "t1").await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = manager(&server, store.clone());
    session.initialize().await;

    let user = session.login("a@b.com", "pw").await.unwrap();
    assert_eq!(user.email, "a@b.com");
    assert_eq!(store.load().unwrap(), Some("t1".to_string()));
    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert_eq!(session.credential().as_deref(), Some("t1"));
}

#[tokio::test]
async fn login_failure_leaves_state_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect email or password"})),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = manager(&server, store.clone());
    session.initialize().await;
    let before = session.snapshot();

    let err = session.login("a@b.com", "wrong").await.unwrap_err();
    assert!(matches!(err, SessionError::RequestFailed(_)));
    assert_eq!(err.to_string(), "Incorrect email or password");
    assert_eq!(session.snapshot(), before);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn login_failure_without_detail_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    let err = session.login("a@b.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Login failed");
}

#[tokio::test]
async fn login_with_failing_identity_lookup_commits_nothing() {
    let server = MockServer::start().await;
    mount_login(&server, "t1").await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = manager(&server, store.clone());
    session.initialize().await;

    let err = session.login("a@b.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Login failed");
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn credential_survives_restart_with_file_store() {
    let server = MockServer::start().await;
    mount_login(&server, "t1").await;
    mount_me(&server, "t1").await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credential");

    let first = manager(&server, Arc::new(FileCredentialStore::new(&path)));
    first.initialize().await;
    first.login("a@b.com", "pw").await.unwrap();
    drop(first);

    let second = manager(&server, Arc::new(FileCredentialStore::new(&path)));
    second.initialize().await;
    assert_eq!(second.status(), SessionStatus::Authenticated);
    assert_eq!(second.identity().unwrap().id, 1);
}

// =============================================================================
// register
// =============================================================================

#[tokio::test]
async fn register_does_not_establish_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "email": "new@b.com",
            "is_active": true,
            "created_at": "2024-05-01T09:30:00"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let session = manager(&server, store.clone());
    session.initialize().await;

    let user = session.register("new@b.com", "pw").await.unwrap();
    assert_eq!(user.id, 3);
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn register_failure_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})),
        )
        .mount(&server)
        .await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    let err = session.register("a@b.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Email already registered");

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({})))
        .mount(&server)
        .await;
    let err = session.register("a@b.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Registration failed");
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_from_every_state_is_anonymous() {
    let server = MockServer::start().await;
    mount_login(&server, "t1").await;
    mount_me(&server, "t1").await;

    // Before initialize (Initializing).
    let store = Arc::new(MemoryCredentialStore::with_credential("t0"));
    let session = manager(&server, store.clone());
    session.logout();
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert_eq!(store.load().unwrap(), None);

    // Authenticated.
    session.login("a@b.com", "pw").await.unwrap();
    session.logout();
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert!(session.identity().is_none());
    assert_eq!(store.load().unwrap(), None);

    // Already anonymous.
    session.logout();
    assert_eq!(session.status(), SessionStatus::Anonymous);
}

#[tokio::test]
async fn logout_survives_store_failure() {
    let server = MockServer::start().await;
    mount_login(&server, "t1").await;
    mount_me(&server, "t1").await;

    let session = manager(&server, Arc::new(StuckStore));
    session.login("a@b.com", "pw").await.unwrap();
    session.logout();
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert!(session.credential().is_none());
}

#[tokio::test]
async fn credential_changes_bump_generation() {
    let server = MockServer::start().await;
    mount_login(&server, "t1").await;
    mount_me(&server, "t1").await;

    let session = manager(&server, Arc::new(MemoryCredentialStore::new()));
    session.initialize().await;
    let mut rx = session.subscribe();
    let start = session.generation();

    session.login("a@b.com", "pw").await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().generation, start + 1);

    session.logout();
    assert_eq!(rx.borrow_and_update().generation, start + 2);
    assert_eq!(rx.borrow().status, SessionStatus::Anonymous);
}
