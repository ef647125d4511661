//! Integration tests for login, registration and transparent token renewal

use std::{sync::Arc, time::Duration};

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kisan_api::{
    client::ApiClient, session::SessionManager, workflow::ApplicationWorkflow, ApiError,
};
use kisan_core::{
    domain::{ProfileUpdate, RegistrationProfile, Session, UserId},
    ports::ICredentialStore,
};

use crate::common;

async fn mount_refresh(server: &MockServer, refresh_token: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refresh_token": refresh_token })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn renewed_tokens() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "new-access",
        "refresh_token": "new-refresh",
        "token_type": "bearer",
        "user": common::farmer_json()
    }))
}

fn expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid or expired token" }))
}

#[tokio::test]
async fn login_stores_session_and_attaches_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "ravi@example.com", "password": "kisan123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "token_type": "bearer",
            "user": common::farmer_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::application_json(3, "pending", None)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = common::manager_for(&server, None);
    let user = manager
        .login("ravi@example.com", "kisan123")
        .await
        .expect("login failed");

    assert_eq!(user.id, UserId::new(common::FARMER_ID));
    assert!(!user.is_admin());

    let stored = store.load().expect("session stored");
    assert_eq!(stored.access_token(), "a1");
    assert_eq!(stored.credentials.refresh_token.as_deref(), Some("r1"));
    assert_eq!(stored.user.map(|u| u.id), Some(user.id));

    let workflow = ApplicationWorkflow::new(manager.clone());
    let mine = workflow.list_mine().await.expect("list failed");
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn invalid_credentials_are_an_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "unused", renewed_tokens(), 0).await;

    let (manager, store) = common::manager_for(&server, None);
    let err = manager.login("ravi@example.com", "wrong").await.unwrap_err();

    assert!(matches!(err, ApiError::Authentication(ref m) if m == "Invalid credentials"));
    assert!(store.load().is_none());
}

#[tokio::test]
async fn expired_token_is_renewed_once_and_replayed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "old-refresh", renewed_tokens(), 1).await;
    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            common::application_json(3, "under_review", None)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let (manager, store) = common::manager_for(&server, Some(session));

    let mine = ApplicationWorkflow::new(manager.clone())
        .list_mine()
        .await
        .expect("request should succeed after renewal");
    assert_eq!(mine[0].id.get(), 3);

    let stored = store.load().expect("session kept");
    assert_eq!(stored.access_token(), "new-access");
    assert_eq!(stored.credentials.refresh_token.as_deref(), Some("new-refresh"));
    assert!(stored.user.is_some());
}

#[tokio::test]
async fn failed_renewal_returns_original_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "old-refresh",
        ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid refresh token" })),
        1,
    )
    .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let (manager, store) = common::manager_for(&server, Some(session));

    let err = ApplicationWorkflow::new(manager.clone())
        .list_mine()
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Invalid or expired token"));
    assert!(err.requires_login());
    // The caller decides whether to drop the session.
    assert_eq!(store.load().expect("session kept").access_token(), "old-access");
}

#[tokio::test]
async fn missing_refresh_token_returns_original_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "anything", renewed_tokens(), 0).await;

    let session = common::session_for(common::farmer_json(), "old-access", None);
    let (manager, _store) = common::manager_for(&server, Some(session));

    let err = ApplicationWorkflow::new(manager).list_mine().await.unwrap_err();
    assert!(err.requires_login());
}

#[tokio::test]
async fn second_unauthorized_after_renewal_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "old-refresh", renewed_tokens(), 1).await;
    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid user" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let (manager, _store) = common::manager_for(&server, Some(session));

    let err = ApplicationWorkflow::new(manager)
        .list_mine()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Invalid user"));
}

#[tokio::test]
async fn concurrent_failures_share_one_renewal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(expired())
        .expect(1..=2)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "old-refresh",
        renewed_tokens().set_delay(Duration::from_millis(200)),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let (manager, _store) = common::manager_for(&server, Some(session));
    let workflow = ApplicationWorkflow::new(manager);

    let (first, second) = tokio::join!(workflow.list_mine(), workflow.list_mine());
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn renewal_is_retried_after_a_transient_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(expired())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "detail": "Service unavailable" })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "old-refresh", renewed_tokens(), 1).await;
    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let (manager, store) = common::manager_for(&server, Some(session));
    let workflow = ApplicationWorkflow::new(manager.clone());

    let err = workflow.list_mine().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));

    let mine = workflow
        .list_mine()
        .await
        .expect("a later request should renew again");
    assert!(mine.is_empty());
    assert_eq!(store.load().expect("session kept").access_token(), "new-access");
}

#[tokio::test]
async fn logout_during_renewal_discards_renewed_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "old-refresh",
        renewed_tokens().set_delay(Duration::from_millis(400)),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let (manager, store) = common::manager_for(&server, Some(session));
    let workflow = ApplicationWorkflow::new(manager.clone());

    let (result, ()) = tokio::join!(workflow.list_mine(), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        manager.logout().await.expect("logout failed");
    });

    assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    assert!(!manager.is_authenticated().await);
    assert!(store.load().is_none());
}

#[tokio::test]
async fn login_during_renewal_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        "old-refresh",
        renewed_tokens().set_delay(Duration::from_millis(400)),
        1,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "admin-access",
            "refresh_token": "admin-refresh",
            "token_type": "bearer",
            "user": common::admin_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let (manager, store) = common::manager_for(&server, Some(session));
    let workflow = ApplicationWorkflow::new(manager.clone());

    let (result, admin) = tokio::join!(workflow.list_mine(), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        manager.login("admin@kissan.com", "admin123").await
    });

    assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    assert!(admin.expect("login failed").is_admin());
    let stored = store.load().expect("session stored");
    assert_eq!(stored.access_token(), "admin-access");
    assert_eq!(
        manager.current_session().await.map(|s| s.access_token().to_string()).as_deref(),
        Some("admin-access")
    );
}

/// Loads a fixed session and refuses every write
struct ReadOnlyStore(Session);

impl ICredentialStore for ReadOnlyStore {
    fn load(&self) -> Option<Session> {
        Some(self.0.clone())
    }

    fn save(&self, _session: &Session) -> anyhow::Result<()> {
        anyhow::bail!("credential store is read-only")
    }

    fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn unsaved_renewal_is_reported_as_storage_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(expired())
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "old-refresh", renewed_tokens(), 1).await;
    Mock::given(method("GET"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "old-access", Some("old-refresh"));
    let manager = Arc::new(SessionManager::new(
        ApiClient::with_base_url(server.uri()),
        Arc::new(ReadOnlyStore(session)),
    ));

    let err = ApplicationWorkflow::new(manager.clone())
        .list_mine()
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Storage(ref e) if e.to_string().contains("read-only")));
    // The renewed tokens stay usable for the rest of this run.
    let current = manager.current_session().await.expect("session cached");
    assert_eq!(current.access_token(), "new-access");
}

#[tokio::test]
async fn register_then_failed_login_leaves_no_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::farmer_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "detail": "Service unavailable" })))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = common::manager_for(&server, None);
    let profile = RegistrationProfile {
        name: "Ravi Kumar".into(),
        email: "ravi@example.com".into(),
        password: "kisan123".into(),
        phone: "9876543210".into(),
        gender: Some("Male".into()),
        dob: None,
        state: "Andhra Pradesh".into(),
        district: "Guntur".into(),
        aadhar: Some("123412341234".into()),
        doc_path: None,
    };

    let err = manager.register(&profile).await.unwrap_err();

    match err {
        ApiError::Registration { user, message } => {
            assert_eq!(user.id, UserId::new(common::FARMER_ID));
            assert!(message.contains("Service unavailable"));
        }
        other => panic!("expected registration error, got {other:?}"),
    }
    assert!(store.load().is_none());
    assert!(!manager.is_authenticated().await);
}

#[tokio::test]
async fn invalid_registration_is_never_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::farmer_json()))
        .expect(0)
        .mount(&server)
        .await;

    let (manager, _store) = common::manager_for(&server, None);
    let profile = RegistrationProfile {
        name: "Ravi Kumar".into(),
        email: "ravi@example.com".into(),
        password: "kisan123".into(),
        phone: "9876543210".into(),
        gender: None,
        dob: None,
        state: "Andhra Pradesh".into(),
        district: "Guntur".into(),
        aadhar: Some("1234".into()),
        doc_path: None,
    };

    assert!(manager.register(&profile).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn profile_update_refreshes_cached_user() {
    let server = MockServer::start().await;

    let mut updated = common::farmer_json();
    updated["district"] = json!("Krishna");
    Mock::given(method("PUT"))
        .and(path(format!("/users/{}", common::FARMER_ID)))
        .and(header("Authorization", "Bearer a1"))
        .and(body_json(json!({ "district": "Krishna" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let session = common::session_for(common::farmer_json(), "a1", Some("r1"));
    let (manager, store) = common::manager_for(&server, Some(session));

    let patch = ProfileUpdate {
        district: Some("Krishna".into()),
        ..Default::default()
    };
    let user = manager
        .update_profile(UserId::new(common::FARMER_ID), &patch)
        .await
        .expect("update failed");

    assert_eq!(user.district.as_deref(), Some("Krishna"));
    let cached = manager.current_user().await.expect("cached user");
    assert_eq!(cached.district.as_deref(), Some("Krishna"));
    let stored = store.load().and_then(|s| s.user).expect("stored user");
    assert_eq!(stored.district.as_deref(), Some("Krishna"));
}

#[tokio::test]
async fn forgot_password_returns_ticket() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(body_json(json!({ "email": "ravi@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "msg": "Reset token generated",
            "token": "reset-123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _store) = common::manager_for(&server, None);
    let ticket = manager
        .forgot_password("ravi@example.com")
        .await
        .expect("forgot-password failed");

    assert_eq!(ticket.msg, "Reset token generated");
    assert_eq!(ticket.token.as_deref(), Some("reset-123"));
}
