//! Principal lookup from verified token claims.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::AuthError;
use super::jwt::SubjectClaims;
use super::rbac::{RoleSet, authorize};
use crate::models::auth::{Admin, NewAdmin, NewUser, Principal, User, UserProfileUpdate};

/// Persistence contract for users and administrators.
///
/// The two tables are independent: nothing stops the same email from
/// appearing in both.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, AuthError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, AuthError>;

    /// Fails with [`AuthError::AdminAlreadyExists`] on a duplicate email.
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, AuthError>;

    async fn mark_user_verified(&self, uid: Uuid) -> Result<Option<User>, AuthError>;

    async fn mark_user_paid(&self, uid: Uuid) -> Result<Option<User>, AuthError>;

    async fn update_user_profile(
        &self,
        uid: Uuid,
        update: &UserProfileUpdate,
    ) -> Result<Option<User>, AuthError>;

    /// Returns whether a row was removed.
    async fn delete_user(&self, uid: Uuid) -> Result<bool, AuthError>;
}

/// Outcome of resolving one email against both stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPrincipals {
    pub user: Option<User>,
    pub admin: Option<Admin>,
}

impl ResolvedPrincipals {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.admin.is_none()
    }

    pub fn authorize(&self, required: &RoleSet) -> Result<(), AuthError> {
        authorize(self.user.as_ref(), self.admin.as_ref(), required)
    }
}

/// Maps token identity to stored principals.
#[derive(Clone)]
pub struct PrincipalResolver {
    store: Arc<dyn PrincipalStore>,
}

impl PrincipalResolver {
    pub fn new(store: Arc<dyn PrincipalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PrincipalStore> {
        &self.store
    }

    pub async fn resolve_user(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.store.find_user_by_email(email).await
    }

    pub async fn resolve_admin(&self, email: &str) -> Result<Option<Admin>, AuthError> {
        self.store.find_admin_by_email(email).await
    }

    /// Look the email up in both stores concurrently.
    pub async fn resolve(&self, email: &str) -> Result<ResolvedPrincipals, AuthError> {
        let (user, admin) = tokio::try_join!(self.resolve_user(email), self.resolve_admin(email))?;
        Ok(ResolvedPrincipals { user, admin })
    }

    /// Pick the principal a token subject was issued for.
    ///
    /// Both email and uid must match, so an email shared by a user and an
    /// admin still resolves to the right one.
    pub async fn resolve_subject(
        &self,
        subject: &SubjectClaims,
    ) -> Result<Option<Principal>, AuthError> {
        let resolved = self.resolve(&subject.email).await?;
        if let Some(user) = resolved.user
            && user.uid.to_string() == subject.user_uid
        {
            return Ok(Some(Principal::User(user)));
        }
        if let Some(admin) = resolved.admin
            && admin.uid.to_string() == subject.user_uid
        {
            return Ok(Some(Principal::Admin(admin)));
        }
        Ok(None)
    }
}
