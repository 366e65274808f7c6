//! Integration tests: in-memory stores, full router, driven via `oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use resultify_api::config::{ApiConfig, SuperAdminSettings};
use resultify_api::services::accounts::bootstrap_super_admin;
use resultify_api::{AppState, router};
use resultify_core::auth::AuthError;
use resultify_core::auth::issuer::TokenIssuer;
use resultify_core::auth::jwt::TokenKind;
use resultify_core::auth::memory::MemoryStore;
use resultify_core::auth::password::PasswordHasher;
use resultify_core::auth::rbac::RoleSet;
use resultify_core::auth::resolver::PrincipalStore;
use resultify_core::mail::MemoryMailer;
use resultify_core::models::auth::{NewAdmin, NewUser, Principal};
use serde_json::{Value, json};
use tower::ServiceExt;

const SUPER_EMAIL: &str = "root@resultify.test";
const SUPER_PASSWORD: &str = "root-password";

struct Harness {
    app: Router,
    state: AppState,
    store: Arc<MemoryStore>,
    mailer: Arc<MemoryMailer>,
}

fn harness() -> Harness {
    harness_with(|_| {})
}

fn harness_with(tweak: impl FnOnce(&mut ApiConfig)) -> Harness {
    let mut config = ApiConfig::with_secret("integration-secret");
    config.bcrypt_cost = 4;
    config.super_admin = Some(SuperAdminSettings {
        email: SUPER_EMAIL.into(),
        password: SUPER_PASSWORD.into(),
        first_name: "Root".into(),
        last_name: "Admin".into(),
        phone_number: "000".into(),
    });
    tweak(&mut config);

    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(config, store.clone(), store.clone(), mailer.clone())
        .expect("state");
    Harness {
        app: router(state.clone()),
        state,
        store,
        mailer,
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, json)
}

async fn signup(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/user/signup",
        None,
        Some(json!({
            "email": email,
            "password": password,
            "first_name": "Ada",
            "last_name": "Obi",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup: {body}");
    body
}

/// Returns `(access_token, refresh_token)`.
async fn login(app: &Router, scope: &str, email: &str, password: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        &format!("/api/v1/{scope}/login"),
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login: {body}");
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

async fn wait_for_mail(mailer: &MemoryMailer, count: usize) {
    for _ in 0..100 {
        if mailer.sent().len() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {count} mails, got {}", mailer.sent().len());
}

#[tokio::test]
async fn root_greets() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Resultify");
}

#[tokio::test]
async fn signup_login_and_profile() {
    let h = harness();
    let created = signup(&h.app, "ada@x.com", "pw-123").await;
    assert_eq!(created["email"], "ada@x.com");
    assert_eq!(created["is_verified"], false);
    assert!(created.get("password_hash").is_none());

    wait_for_mail(&h.mailer, 1).await;
    let sent = h.mailer.sent();
    let mail = &sent[0];
    assert_eq!(mail.recipients, vec!["ada@x.com".to_string()]);
    assert!(mail.html_body.contains("/api/v1/user/verify/"));

    let (access, _) = login(&h.app, "user", "ada@x.com", "pw-123").await;
    let (status, profile) =
        call(&h.app, Method::GET, "/api/v1/user/profile", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "ada@x.com");
    assert_eq!(profile["uid"], created["uid"]);
}

#[tokio::test]
async fn duplicate_signup_rejected() {
    let h = harness();
    signup(&h.app, "dup@x.com", "pw").await;
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/api/v1/user/signup",
        None,
        Some(json!({
            "email": "dup@x.com",
            "password": "other",
            "first_name": "B",
            "last_name": "C",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user_already_exists");
}

#[tokio::test]
async fn verification_link_marks_user_verified() {
    let h = harness();
    let created = signup(&h.app, "v@x.com", "pw").await;
    let uid = created["uid"].as_str().unwrap().parse().unwrap();
    let token = h.state.links.create_token(uid, "v@x.com").unwrap();

    let (status, _) = call(
        &h.app,
        Method::GET,
        &format!("/api/v1/user/verify/{token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let user = h.store.find_user_by_email("v@x.com").await.unwrap().unwrap();
    assert_eq!(user.uid, uid);
    assert!(user.is_verified);

    let (status, body) = call(&h.app, Method::GET, "/api/v1/user/verify/garbage", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn login_does_not_reveal_which_part_failed() {
    let h = harness();
    signup(&h.app, "e@x.com", "right").await;

    let wrong_password = call(
        &h.app,
        Method::POST,
        "/api/v1/user/login",
        None,
        Some(json!({ "email": "e@x.com", "password": "wrong" })),
    )
    .await;
    let unknown_email = call(
        &h.app,
        Method::POST,
        "/api/v1/user/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "right" })),
    )
    .await;

    assert_eq!(wrong_password.0, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.1["error"], "invalid_credentials");
}

#[tokio::test]
async fn missing_and_malformed_credentials() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/api/v1/user/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_credential");

    let (status, body) =
        call(&h.app, Method::GET, "/api/v1/user/profile", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn token_kinds_are_not_interchangeable() {
    let h = harness();
    signup(&h.app, "k@x.com", "pw").await;
    let (access, refresh) = login(&h.app, "user", "k@x.com", "pw").await;

    let (status, body) =
        call(&h.app, Method::GET, "/api/v1/user/profile", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "access_token_required");

    let (status, body) = call(
        &h.app,
        Method::GET,
        "/api/v1/user/refresh_token",
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "refresh_token_required");
}

#[tokio::test]
async fn refresh_issues_working_access_token() {
    let h = harness();
    signup(&h.app, "r@x.com", "pw").await;
    let (_, refresh) = login(&h.app, "user", "r@x.com", "pw").await;

    let (status, body) = call(
        &h.app,
        Method::GET,
        "/api/v1/user/refresh_token",
        Some(&refresh),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["access_token"].as_str().unwrap();

    let claims = h.state.issuer.codec().decode(fresh).unwrap();
    assert!(!claims.refresh);
    assert_eq!(claims.user.role.as_deref(), Some("user"));

    let (status, _) = call(&h.app, Method::GET, "/api/v1/user/profile", Some(fresh), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_access_token() {
    let h = harness();
    signup(&h.app, "l@x.com", "pw").await;
    let (access, _) = login(&h.app, "user", "l@x.com", "pw").await;

    let (status, _) = call(&h.app, Method::GET, "/api/v1/user/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        call(&h.app, Method::GET, "/api/v1/user/profile", Some(&access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "revoked_token");

    // Second logout with the same token is accepted and stores nothing new.
    let (status, _) = call(&h.app, Method::GET, "/api/v1/user/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.store.revoked_count(), 1);
}

#[tokio::test]
async fn roles_are_enforced_per_route_group() {
    let h = harness();
    bootstrap_super_admin(&h.state).await.unwrap();
    signup(&h.app, "u@x.com", "pw").await;

    let (user_access, _) = login(&h.app, "user", "u@x.com", "pw").await;
    let (admin_access, _) = login(&h.app, "admin", SUPER_EMAIL, SUPER_PASSWORD).await;

    let (status, body) = call(
        &h.app,
        Method::GET,
        "/api/v1/admin/profile",
        Some(&user_access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");

    let (status, _) = call(
        &h.app,
        Method::GET,
        "/api/v1/user/profile",
        Some(&admin_access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &h.app,
        Method::GET,
        "/api/v1/admin/profile",
        Some(&admin_access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "super_admin");
}

#[tokio::test]
async fn super_admin_bootstrap_is_idempotent() {
    let h = harness();
    let first = bootstrap_super_admin(&h.state).await.unwrap();
    assert_eq!(first.map(|a| a.role), Some("super_admin".to_string()));
    assert!(bootstrap_super_admin(&h.state).await.unwrap().is_none());

    let admin = h.store.find_admin_by_email(SUPER_EMAIL).await.unwrap().unwrap();
    assert_eq!(admin.role, "super_admin");
}

#[tokio::test]
async fn admin_creation_rejects_duplicates() {
    let h = harness();
    bootstrap_super_admin(&h.state).await.unwrap();
    let (access, _) = login(&h.app, "admin", SUPER_EMAIL, SUPER_PASSWORD).await;

    let request = json!({
        "email": "ops@x.com",
        "first_name": "Ops",
        "last_name": "One",
        "phone_number": "123",
    });
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/api/v1/admin/create",
        Some(&access),
        Some(request.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "admin");

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/api/v1/admin/create",
        Some(&access),
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "admin_already_exists");

    // Bootstrap mail plus one credentials mail for the new admin.
    wait_for_mail(&h.mailer, 2).await;
    assert!(
        h.mailer
            .sent()
            .iter()
            .any(|m| m.recipients == vec!["ops@x.com".to_string()])
    );
}

#[tokio::test]
async fn regular_admin_can_log_in_and_create_admins() {
    let h = harness();
    let hash = PasswordHasher::new(4).hash("admin-pw").unwrap();
    h.store
        .insert_admin(NewAdmin::new("a@x.com", hash, "A", "Dmin", "1"))
        .await
        .unwrap();

    let (access, refresh) = login(&h.app, "admin", "a@x.com", "admin-pw").await;
    let (status, _) = call(
        &h.app,
        Method::POST,
        "/api/v1/admin/create",
        Some(&access),
        Some(json!({
            "email": "b@x.com",
            "first_name": "B",
            "last_name": "Dmin",
            "phone_number": "2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &h.app,
        Method::GET,
        "/api/v1/admin/refresh_token",
        Some(&refresh),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let claims = h
        .state
        .issuer
        .codec()
        .decode(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.user.role.as_deref(), Some("admin"));
}

#[tokio::test]
async fn update_user_only_touches_allowed_fields() {
    let h = harness();
    signup(&h.app, "p@x.com", "pw").await;
    let (access, _) = login(&h.app, "user", "p@x.com", "pw").await;

    let (status, body) = call(
        &h.app,
        Method::PUT,
        "/api/v1/user/update_user",
        Some(&access),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = call(
        &h.app,
        Method::PUT,
        "/api/v1/user/update_user",
        Some(&access),
        Some(json!({ "first_name": "Grace", "phone_number": "555" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Grace");
    assert_eq!(body["phone_number"], "555");
    assert_eq!(body["last_name"], "Obi");

    let user = h.store.find_user_by_email("p@x.com").await.unwrap().unwrap();
    assert_eq!(user.role, "user");
}

#[tokio::test]
async fn payment_confirmation_and_account_deletion() {
    let h = harness();
    signup(&h.app, "d@x.com", "pw").await;
    let (access, _) = login(&h.app, "user", "d@x.com", "pw").await;

    let (status, body) = call(
        &h.app,
        Method::PATCH,
        "/api/v1/user/confirm_payments",
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_paid"], true);

    let (status, _) = call(
        &h.app,
        Method::DELETE,
        "/api/v1/user/delete_account",
        Some(&access),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Token still verifies but resolves to nobody.
    let (status, _) = call(&h.app, Method::GET, "/api/v1/user/profile", Some(&access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &h.app,
        Method::POST,
        "/api/v1/user/login",
        None,
        Some(json!({ "email": "d@x.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_credentials");
}

/// The role-guard pipeline evaluated at an explicit clock reading.
async fn guard_at(
    state: &AppState,
    header: &str,
    roles: &RoleSet,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let claims = state
        .authenticator
        .authenticate_at(Some(header), TokenKind::Access, now)?;
    state.revocations.ensure_active(&claims).await?;
    state
        .principals
        .resolve(&claims.user.email)
        .await?
        .authorize(roles)
}

#[tokio::test]
async fn one_hour_user_token_over_time() {
    let h = harness();
    let user = h
        .store
        .insert_user(NewUser::new("t@x.com", "h".into(), "T", "Zero"))
        .await
        .unwrap();

    let t0 = Utc::now();
    let subject = TokenIssuer::access_subject(&Principal::User(user));
    let token = h
        .state
        .issuer
        .codec()
        .issue_at(&subject, false, Duration::hours(1), t0)
        .unwrap();
    let header = format!("Bearer {token}");

    let half_hour = t0 + Duration::minutes(30);
    assert!(guard_at(&h.state, &header, &RoleSet::users(), half_hour).await.is_ok());
    assert!(matches!(
        guard_at(&h.state, &header, &RoleSet::administrators(), half_hour).await,
        Err(AuthError::AccessDenied)
    ));

    let past_expiry = t0 + Duration::minutes(61);
    for roles in [RoleSet::users(), RoleSet::administrators()] {
        assert!(matches!(
            guard_at(&h.state, &header, &roles, past_expiry).await,
            Err(AuthError::InvalidToken)
        ));
    }
}

#[tokio::test]
async fn malformed_bodies_get_the_error_shape() {
    let h = harness();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/user/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_error");

    // Well-formed JSON missing a required field.
    let (status, body) = call(
        &h.app,
        Method::POST,
        "/api/v1/user/signup",
        None,
        Some(json!({ "email": "m@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn refresh_rejects_token_past_expiry_inside_leeway() {
    let h = harness_with(|c| c.jwt.leeway_secs = 120);
    let user = h
        .store
        .insert_user(NewUser::new("late@x.com", "h".into(), "L", "Ate"))
        .await
        .unwrap();
    let principal = Principal::User(user);

    let ttl = Duration::days(2);
    let issued = Utc::now() - ttl - Duration::seconds(60);
    let token = h
        .state
        .issuer
        .codec()
        .issue_at(&TokenIssuer::refresh_subject(&principal), true, ttl, issued)
        .unwrap();

    let (status, body) = call(
        &h.app,
        Method::GET,
        "/api/v1/user/refresh_token",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_token");
}
