//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API response shapes in
//! `resultify_api::models`. Password hashes are never serialized.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::auth::rbac::{ROLE_ADMIN, ROLE_SUPER_ADMIN, ROLE_USER};

/// A registered user (exam candidate or result viewer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub uid: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub exam_centre_no: Option<String>,
    pub exam_id: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An administrator. The bootstrapped administrator carries `super_admin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Admin {
    pub uid: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which principal store an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    Admin,
}

/// A concrete authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(User),
    Admin(Admin),
}

impl Principal {
    pub fn uid(&self) -> Uuid {
        match self {
            Principal::User(u) => u.uid,
            Principal::Admin(a) => a.uid,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::User(u) => &u.email,
            Principal::Admin(a) => &a.email,
        }
    }

    pub fn role(&self) -> &str {
        match self {
            Principal::User(u) => &u.role,
            Principal::Admin(a) => &a.role,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Principal::User(u) => &u.password_hash,
            Principal::Admin(a) => &a.password_hash,
        }
    }
}

/// Revocation record. A jti appears at most once and is never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RevokedTokenRecord {
    pub record_id: Uuid,
    pub jti: String,
}

/// Insert payload for a new user. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

impl NewUser {
    pub fn new(email: &str, password_hash: String, first_name: &str, last_name: &str) -> Self {
        Self {
            email: email.to_string(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: ROLE_USER.to_string(),
        }
    }
}

/// Insert payload for a new administrator.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub role: String,
}

impl NewAdmin {
    /// Regular administrator (role `admin`).
    pub fn new(
        email: &str,
        password_hash: String,
        first_name: &str,
        last_name: &str,
        phone_number: &str,
    ) -> Self {
        Self {
            email: email.to_string(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone_number: phone_number.to_string(),
            role: ROLE_ADMIN.to_string(),
        }
    }

    /// Same as [`NewAdmin::new`] but with the `super_admin` role.
    pub fn super_admin(
        email: &str,
        password_hash: String,
        first_name: &str,
        last_name: &str,
        phone_number: &str,
    ) -> Self {
        Self {
            role: ROLE_SUPER_ADMIN.to_string(),
            ..Self::new(email, password_hash, first_name, last_name, phone_number)
        }
    }
}

/// Fields a user may change on their own profile.
pub const USER_UPDATABLE_FIELDS: &[&str] = &["first_name", "last_name", "phone_number"];

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl UserProfileUpdate {
    /// Build an update from a client-supplied JSON object.
    ///
    /// Every key is checked against [`USER_UPDATABLE_FIELDS`] before anything
    /// is applied, so `role`, `is_verified`, `password_hash` and friends are
    /// rejected rather than silently ignored.
    pub fn from_json(fields: &Map<String, Value>) -> Result<Self, AuthError> {
        let mut update = Self::default();
        for (key, value) in fields {
            let not_updatable = || AuthError::Validation(format!("field '{key}' cannot be updated"));
            if !USER_UPDATABLE_FIELDS.contains(&key.as_str()) {
                return Err(not_updatable());
            }
            let Value::String(text) = value else {
                return Err(AuthError::Validation(format!(
                    "field '{key}' must be a string"
                )));
            };
            let slot = update.field_mut(key).ok_or_else(not_updatable)?;
            *slot = Some(text.clone());
        }
        if update.is_empty() {
            return Err(AuthError::Validation("no fields to update".into()));
        }
        Ok(update)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "first_name" => Some(&mut self.first_name),
            "last_name" => Some(&mut self.last_name),
            "phone_number" => Some(&mut self.phone_number),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }

    /// Apply onto an in-memory user (used by the in-memory store).
    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.first_name {
            user.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            user.last_name = v.clone();
        }
        if let Some(v) = &self.phone_number {
            user.phone_number = Some(v.clone());
        }
    }
}
