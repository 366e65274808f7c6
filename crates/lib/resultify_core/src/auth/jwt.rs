//! JWT token encoding and verification.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;

/// Access token lifetime: 1 hour.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 60 * 60;

/// Refresh token lifetime: 2 days.
pub const REFRESH_TOKEN_EXPIRY_SECS: i64 = 2 * 24 * 60 * 60;

/// Default signing algorithm.
pub const DEFAULT_ALGORITHM: &str = "HS256";

/// Whether a token authorizes API calls or only mints new access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity snapshot embedded in a token (the `user` claim).
///
/// Refresh tokens carry no role; it is re-read from storage on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectClaims {
    pub email: String,
    pub user_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Full JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user: SubjectClaims,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Unique token id, the revocation key.
    pub jti: String,
    pub refresh: bool,
}

impl TokenClaims {
    pub fn kind(&self) -> TokenKind {
        if self.refresh {
            TokenKind::Refresh
        } else {
            TokenKind::Access
        }
    }

    /// Strict check: the token is spent once `now` reaches `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Signing settings, loaded once at startup.
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub algorithm: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Clock skew tolerated when decoding, in seconds.
    pub leeway_secs: i64,
}

impl JwtSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            access_ttl: Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
            refresh_ttl: Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS),
            leeway_secs: 0,
        }
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Signs and verifies tokens with a process-wide HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    leeway_secs: i64,
}

impl TokenCodec {
    /// Build a codec. Only HMAC algorithms are accepted since the key is a
    /// shared secret.
    pub fn new(secret: &[u8], algorithm: &str, leeway_secs: i64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Config("JWT secret is empty".into()));
        }
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| AuthError::Config(format!("unknown JWT algorithm '{algorithm}'")))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Config(format!(
                "JWT algorithm {algorithm:?} needs a key pair, not a shared secret"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
            leeway_secs: leeway_secs.max(0),
        })
    }

    pub fn from_settings(settings: &JwtSettings) -> Result<Self, AuthError> {
        Self::new(
            settings.secret.as_bytes(),
            &settings.algorithm,
            settings.leeway_secs,
        )
    }

    /// Issue a token expiring `ttl` from now.
    pub fn issue(
        &self,
        subject: &SubjectClaims,
        refresh: bool,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        self.issue_at(subject, refresh, ttl, Utc::now())
    }

    /// Issue a token as if the clock read `now`.
    pub fn issue_at(
        &self,
        subject: &SubjectClaims,
        refresh: bool,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            user: subject.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            refresh,
        };
        self.sign(&claims)
    }

    /// Verify signature and expiry. Malformed, forged and expired tokens all
    /// come back as [`AuthError::InvalidToken`].
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.decode_at(token, Utc::now())
    }

    /// [`decode`](Self::decode) against an explicit clock reading.
    ///
    /// A token is accepted while `now <= exp + leeway`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let claims: TokenClaims = self.verify_signature(token).ok_or(AuthError::InvalidToken)?;
        if claims.exp.saturating_add(self.leeway_secs) < now.timestamp() {
            debug!(jti = %claims.jti, "token expired");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// Sign arbitrary claims with this codec's key.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Check the signature and shape only. Expiry is left to the caller.
    pub fn verify_signature<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);
        match decode::<T>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "token rejected");
                None
            }
        }
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    for var in ["JWT_SECRET", "AUTH_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }

    let path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&path, &secret);
    info!(path = %path.display(), "generated new JWT secret");
    secret
}

fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resultify")
        .join("jwt-secret")
}
