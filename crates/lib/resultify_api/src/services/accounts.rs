//! Account lifecycle: signup, verification, profile changes and admin
//! provisioning.

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use resultify_core::auth::AuthError;
use resultify_core::mail::{admin_credentials_message, dispatch, verification_message};
use resultify_core::models::auth::{Admin, NewAdmin, NewUser, User, UserProfileUpdate};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AdminProfile, CreateAdminRequest, MessageResponse, SignupRequest, UserProfile};

/// Length of generated admin passwords.
const GENERATED_PASSWORD_LEN: usize = 12;

fn generate_password() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn require_field(name: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Register a user and mail them a verification link.
pub async fn signup(state: &AppState, req: SignupRequest) -> AppResult<UserProfile> {
    require_field("email", &req.email)?;
    require_field("password", &req.password)?;

    if state.principals.resolve_user(&req.email).await?.is_some() {
        return Err(AppError::UserAlreadyExists);
    }

    let hash = state.hasher.hash_blocking(req.password).await?;
    let user = state
        .principals
        .store()
        .insert_user(NewUser::new(&req.email, hash, &req.first_name, &req.last_name))
        .await?;

    let token = state.links.create_token(user.uid, &user.email)?;
    let link = state.links.link(&token);
    dispatch(
        state.mailer.clone(),
        verification_message(&user.email, &link),
    );

    info!(uid = %user.uid, "user signed up");
    Ok(user.into())
}

/// Mark the account behind a verification link as verified.
pub async fn verify_email(state: &AppState, token: &str) -> AppResult<MessageResponse> {
    let claims = state.links.verify(token)?;
    let user = state
        .principals
        .store()
        .mark_user_verified(claims.user_uid)
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(uid = %user.uid, "email verified");
    Ok(MessageResponse::new("Account verified successfully"))
}

pub async fn confirm_payment(state: &AppState, user: &User) -> AppResult<UserProfile> {
    let user = state
        .principals
        .store()
        .mark_user_paid(user.uid)
        .await?
        .ok_or(AppError::UserNotFound)?;
    info!(uid = %user.uid, "payment confirmed");
    Ok(user.into())
}

/// Apply a partial profile update restricted to the allow-listed fields.
pub async fn update_user(
    state: &AppState,
    user: &User,
    fields: &Map<String, Value>,
) -> AppResult<UserProfile> {
    let update = UserProfileUpdate::from_json(fields)?;
    let user = state
        .principals
        .store()
        .update_user_profile(user.uid, &update)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok(user.into())
}

pub async fn delete_account(state: &AppState, user: &User) -> AppResult<()> {
    if !state.principals.store().delete_user(user.uid).await? {
        return Err(AppError::UserNotFound);
    }
    info!(uid = %user.uid, "account deleted");
    Ok(())
}

/// Create a regular administrator with a generated password, mailed to them.
pub async fn create_admin(state: &AppState, req: CreateAdminRequest) -> AppResult<AdminProfile> {
    require_field("email", &req.email)?;

    if state.principals.resolve_admin(&req.email).await?.is_some() {
        return Err(AppError::AdminAlreadyExists);
    }

    let password = generate_password();
    let hash = state.hasher.hash_blocking(password.clone()).await?;
    let admin = state
        .principals
        .store()
        .insert_admin(NewAdmin::new(
            &req.email,
            hash,
            &req.first_name,
            &req.last_name,
            &req.phone_number,
        ))
        .await?;

    dispatch(
        state.mailer.clone(),
        admin_credentials_message(&admin, &password),
    );

    info!(uid = %admin.uid, "admin created");
    Ok(admin.into())
}

/// Seed the configured super administrator if absent.
///
/// Returns the created record, or `None` when nothing is configured or the
/// account already exists.
pub async fn bootstrap_super_admin(state: &AppState) -> Result<Option<Admin>, AuthError> {
    let Some(settings) = state.config.super_admin.as_ref() else {
        return Ok(None);
    };

    if state.principals.resolve_admin(&settings.email).await?.is_some() {
        info!(email = %settings.email, "super admin already present");
        return Ok(None);
    }

    let hash = state.hasher.hash_blocking(settings.password.clone()).await?;
    let admin = match state
        .principals
        .store()
        .insert_admin(NewAdmin::super_admin(
            &settings.email,
            hash,
            &settings.first_name,
            &settings.last_name,
            &settings.phone_number,
        ))
        .await
    {
        Ok(admin) => admin,
        Err(AuthError::AdminAlreadyExists) => {
            warn!(email = %settings.email, "super admin created concurrently");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    dispatch(
        state.mailer.clone(),
        admin_credentials_message(&admin, &settings.password),
    );

    info!(uid = %admin.uid, "super admin bootstrapped");
    Ok(Some(admin))
}
