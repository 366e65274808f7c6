//! # resultify_api
//!
//! HTTP API library for Resultify.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use resultify_core::auth::AuthError;
use resultify_core::auth::authenticator::TokenAuthenticator;
use resultify_core::auth::issuer::TokenIssuer;
use resultify_core::auth::password::PasswordHasher;
use resultify_core::auth::rbac::RoleSet;
use resultify_core::auth::resolver::{PrincipalResolver, PrincipalStore};
use resultify_core::auth::revocation::{RevocationGuard, RevocationStore};
use resultify_core::auth::verification::VerificationLinks;
use resultify_core::mail::Mailer;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{admin, health, session, user};
use crate::middleware::auth::{RoleGuard, require_access_token, require_refresh_token, require_roles};

/// Shared application state passed to all handlers.
///
/// Built once at startup; every component is immutable or internally pooled.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub issuer: Arc<TokenIssuer>,
    pub authenticator: Arc<TokenAuthenticator>,
    pub revocations: RevocationGuard,
    pub principals: PrincipalResolver,
    pub hasher: PasswordHasher,
    pub links: Arc<VerificationLinks>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Wire the auth components from configuration and storage handles.
    pub fn new(
        config: ApiConfig,
        principals: Arc<dyn PrincipalStore>,
        revocations: Arc<dyn RevocationStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let issuer = TokenIssuer::from_settings(&config.jwt)?;
        let authenticator = TokenAuthenticator::new(issuer.codec().clone());
        let links = VerificationLinks::new(issuer.codec().clone(), &config.domain_url);
        Ok(Self {
            hasher: PasswordHasher::new(config.bcrypt_cost),
            issuer: Arc::new(issuer),
            authenticator: Arc::new(authenticator),
            revocations: RevocationGuard::new(revocations),
            principals: PrincipalResolver::new(principals),
            links: Arc::new(links),
            mailer,
            config,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `resultify_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    resultify_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/user/signup", post(user::signup_handler))
        .route("/user/login", post(user::login_handler))
        .route("/user/verify/{token}", get(user::verify_email_handler))
        .route("/admin/login", post(admin::login_handler));

    // Any valid access token, revoked or not, so logging out twice is harmless.
    let sessions = Router::new()
        .route("/user/logout", get(session::logout_handler))
        .route("/admin/logout", get(session::logout_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_access_token,
        ));

    let refresh = Router::new()
        .route("/user/refresh_token", get(session::refresh_handler))
        .route("/admin/refresh_token", get(session::refresh_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_refresh_token,
        ));

    let users = Router::new()
        .route("/user/profile", get(user::profile_handler))
        .route("/user/confirm_payments", patch(user::confirm_payment_handler))
        .route("/user/update_user", put(user::update_user_handler))
        .route("/user/delete_account", delete(user::delete_account_handler))
        .layer(axum::middleware::from_fn_with_state(
            RoleGuard::new(state.clone(), RoleSet::users()),
            require_roles,
        ));

    let admins = Router::new()
        .route("/admin/profile", get(admin::profile_handler))
        .route("/admin/create", post(admin::create_admin_handler))
        .layer(axum::middleware::from_fn_with_state(
            RoleGuard::new(state.clone(), RoleSet::administrators()),
            require_roles,
        ));

    let api = Router::new()
        .merge(public)
        .merge(sessions)
        .merge(refresh)
        .merge(users)
        .merge(admins);

    Router::new()
        .route("/", get(health::root_handler))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
