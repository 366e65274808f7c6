//! Server-side token revocation (the blacklist).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::AuthError;
use super::jwt::TokenClaims;
use crate::models::auth::RevokedTokenRecord;

/// Result of inserting a jti into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationInsert {
    Inserted(RevokedTokenRecord),
    /// The storage uniqueness constraint rejected a duplicate jti.
    AlreadyRevoked,
}

/// Persistence contract for revoked token ids.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Exact-match lookup by jti.
    async fn find_revoked_by_jti(&self, jti: &str)
    -> Result<Option<RevokedTokenRecord>, AuthError>;

    /// Insert a jti. Duplicates must surface as
    /// [`RevocationInsert::AlreadyRevoked`], not as an error.
    async fn insert_revoked_token(&self, jti: &str) -> Result<RevocationInsert, AuthError>;
}

/// Checks and records revoked tokens.
#[derive(Clone)]
pub struct RevocationGuard {
    store: Arc<dyn RevocationStore>,
}

impl RevocationGuard {
    pub fn new(store: Arc<dyn RevocationStore>) -> Self {
        Self { store }
    }

    pub async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        Ok(self.store.find_revoked_by_jti(jti).await?.is_some())
    }

    /// Fail with [`AuthError::RevokedToken`] if the token was revoked.
    pub async fn ensure_active(&self, claims: &TokenClaims) -> Result<(), AuthError> {
        if self.is_revoked(&claims.jti).await? {
            debug!(jti = %claims.jti, "rejected revoked token");
            return Err(AuthError::RevokedToken);
        }
        Ok(())
    }

    /// Revoke a jti. Revoking twice returns the first record.
    pub async fn revoke(&self, jti: &str) -> Result<RevokedTokenRecord, AuthError> {
        match self.store.insert_revoked_token(jti).await? {
            RevocationInsert::Inserted(record) => {
                info!(jti, "token revoked");
                Ok(record)
            }
            RevocationInsert::AlreadyRevoked => {
                debug!(jti, "token already revoked");
                self.store.find_revoked_by_jti(jti).await?.ok_or_else(|| {
                    AuthError::Internal(format!("revocation of {jti} reported but not found"))
                })
            }
        }
    }
}
