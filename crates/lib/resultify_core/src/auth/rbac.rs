//! Role-Based Access Control.
//!
//! Roles are flat strings compared exactly. There is no hierarchy:
//! `super_admin` passes only where it is listed.

use std::collections::BTreeSet;

use super::AuthError;
use crate::models::auth::{Admin, User};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

/// Roles an operation accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    /// `{user}`.
    pub fn users() -> Self {
        Self::new([ROLE_USER])
    }

    /// `{admin, super_admin}`.
    pub fn administrators() -> Self {
        Self::new([ROLE_ADMIN, ROLE_SUPER_ADMIN])
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Succeeds if either resolved principal holds a required role.
pub fn authorize(
    user: Option<&User>,
    admin: Option<&Admin>,
    required: &RoleSet,
) -> Result<(), AuthError> {
    let user_ok = user.is_some_and(|u| required.contains(&u.role));
    let admin_ok = admin.is_some_and(|a| required.contains(&a.role));
    if user_ok || admin_ok {
        Ok(())
    } else {
        Err(AuthError::AccessDenied)
    }
}
