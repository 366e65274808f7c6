//! Token issuance for authenticated principals.

use chrono::{DateTime, Duration, Utc};

use super::AuthError;
use super::jwt::{JwtSettings, SubjectClaims, TokenClaims, TokenCodec};
use crate::models::auth::Principal;

/// Access + refresh tokens handed out on login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Builds access and refresh tokens from principal identity.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(codec: TokenCodec, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            codec,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_settings(settings: &JwtSettings) -> Result<Self, AuthError> {
        Ok(Self::new(
            TokenCodec::from_settings(settings)?,
            settings.access_ttl,
            settings.refresh_ttl,
        ))
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Subject for an access token: email, uid and current role.
    pub fn access_subject(principal: &Principal) -> SubjectClaims {
        SubjectClaims {
            email: principal.email().to_string(),
            user_uid: principal.uid().to_string(),
            role: Some(principal.role().to_string()),
        }
    }

    /// Subject for a refresh token: email and uid only.
    pub fn refresh_subject(principal: &Principal) -> SubjectClaims {
        SubjectClaims {
            role: None,
            ..Self::access_subject(principal)
        }
    }

    pub fn issue_access(&self, principal: &Principal) -> Result<String, AuthError> {
        self.codec
            .issue(&Self::access_subject(principal), false, self.access_ttl)
    }

    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access(principal)?,
            refresh_token: self.codec.issue(
                &Self::refresh_subject(principal),
                true,
                self.refresh_ttl,
            )?,
        })
    }

    /// Mint a new access token from verified refresh claims.
    ///
    /// `principal` must be freshly loaded from storage so the new token carries
    /// the current role. The refresh token's own expiry is compared against
    /// `now` here, independent of any leeway applied at decode time.
    pub fn reissue_access(
        &self,
        refresh: &TokenClaims,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        if !refresh.refresh {
            return Err(AuthError::RefreshTokenRequired);
        }
        if refresh.is_expired_at(now) {
            return Err(AuthError::InvalidToken);
        }
        if refresh.user.user_uid != principal.uid().to_string() {
            return Err(AuthError::InvalidToken);
        }
        self.issue_access(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::rbac::ROLE_ADMIN;
    use crate::models::auth::Admin;
    use uuid::Uuid;

    fn issuer() -> TokenIssuer {
        let codec = TokenCodec::new(b"issuer-secret", "HS256", 120).unwrap();
        TokenIssuer::new(codec, Duration::seconds(3600), Duration::days(2))
    }

    fn admin(role: &str) -> Principal {
        let now = Utc::now();
        Principal::Admin(Admin {
            uid: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "h".into(),
            first_name: "A".into(),
            last_name: "X".into(),
            phone_number: "1".into(),
            role: role.into(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn pair_has_role_only_on_access() {
        let issuer = issuer();
        let principal = admin(ROLE_ADMIN);
        let pair = issuer.issue_pair(&principal).unwrap();

        let access = issuer.codec().decode(&pair.access_token).unwrap();
        assert!(!access.refresh);
        assert_eq!(access.user.role.as_deref(), Some(ROLE_ADMIN));
        assert_eq!(access.exp - access.iat, 3600);

        let refresh = issuer.codec().decode(&pair.refresh_token).unwrap();
        assert!(refresh.refresh);
        assert_eq!(refresh.user.role, None);
        assert_eq!(refresh.user.email, "a@x.com");
        assert_eq!(refresh.exp - refresh.iat, 2 * 24 * 3600);
    }

    #[test]
    fn reissue_uses_current_role() {
        let issuer = issuer();
        let before = admin(ROLE_ADMIN);
        let pair = issuer.issue_pair(&before).unwrap();
        let refresh = issuer.codec().decode(&pair.refresh_token).unwrap();

        let promoted = match before {
            Principal::Admin(mut a) => {
                a.role = "super_admin".into();
                Principal::Admin(a)
            }
            other => other,
        };
        let token = issuer.reissue_access(&refresh, &promoted, Utc::now()).unwrap();
        let access = issuer.codec().decode(&token).unwrap();
        assert_eq!(access.user.role.as_deref(), Some("super_admin"));
        assert!(!access.refresh);
    }

    #[test]
    fn reissue_rejects_access_tokens() {
        let issuer = issuer();
        let principal = admin(ROLE_ADMIN);
        let pair = issuer.issue_pair(&principal).unwrap();
        let access = issuer.codec().decode(&pair.access_token).unwrap();
        assert!(matches!(
            issuer.reissue_access(&access, &principal, Utc::now()),
            Err(AuthError::RefreshTokenRequired)
        ));
    }

    #[test]
    fn reissue_checks_expiry_despite_leeway() {
        let issuer = issuer();
        let principal = admin(ROLE_ADMIN);
        let t0 = Utc::now() - Duration::days(2) - Duration::seconds(60);
        let token = issuer
            .codec()
            .issue_at(&TokenIssuer::refresh_subject(&principal), true, Duration::days(2), t0)
            .unwrap();
        // Still inside the 120 s decode leeway.
        let refresh = issuer.codec().decode(&token).unwrap();
        assert!(matches!(
            issuer.reissue_access(&refresh, &principal, Utc::now()),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn reissue_rejects_mismatched_principal() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&admin(ROLE_ADMIN)).unwrap();
        let refresh = issuer.codec().decode(&pair.refresh_token).unwrap();
        assert!(matches!(
            issuer.reissue_access(&refresh, &admin(ROLE_ADMIN), Utc::now()),
            Err(AuthError::InvalidToken)
        ));
    }
}
