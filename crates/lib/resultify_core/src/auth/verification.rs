//! Signed, time-limited email verification links.
//!
//! Link tokens are signed with the JWT secret but carry a `purpose` claim and
//! none of the session claims, so they cannot be used as bearer tokens and
//! bearer tokens cannot be used as links.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use super::jwt::TokenCodec;

/// Links stay valid for one hour.
pub const VERIFICATION_LINK_EXPIRY_SECS: i64 = 60 * 60;

const PURPOSE: &str = "email-verification";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationClaims {
    pub user_uid: Uuid,
    pub email: String,
    pub purpose: String,
    pub exp: i64,
}

#[derive(Clone)]
pub struct VerificationLinks {
    codec: TokenCodec,
    domain_url: String,
}

impl VerificationLinks {
    pub fn new(codec: TokenCodec, domain_url: &str) -> Self {
        Self {
            codec,
            domain_url: domain_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn create_token(&self, user_uid: Uuid, email: &str) -> Result<String, AuthError> {
        self.create_token_at(user_uid, email, Utc::now())
    }

    pub fn create_token_at(
        &self,
        user_uid: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        self.codec.sign(&VerificationClaims {
            user_uid,
            email: email.to_string(),
            purpose: PURPOSE.to_string(),
            exp: (now + Duration::seconds(VERIFICATION_LINK_EXPIRY_SECS)).timestamp(),
        })
    }

    /// Full URL the user clicks.
    pub fn link(&self, token: &str) -> String {
        format!("{}/api/v1/user/verify/{token}", self.domain_url)
    }

    pub fn verify(&self, token: &str) -> Result<VerificationClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerificationClaims, AuthError> {
        let claims: VerificationClaims = self
            .codec
            .verify_signature(token)
            .ok_or(AuthError::InvalidToken)?;
        if claims.purpose != PURPOSE || claims.exp < now.timestamp() {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}
