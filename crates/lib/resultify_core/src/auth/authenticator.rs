//! Bearer-token authentication as a small state machine.
//!
//! One machine serves both access-token and refresh-token consumers; the
//! required [`TokenKind`] decides the final transition.

use chrono::{DateTime, Utc};

use super::AuthError;
use super::jwt::{TokenClaims, TokenCodec, TokenKind};

/// Why a credential was turned away before reaching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingCredential,
    InvalidToken,
    AccessTokenRequired,
    RefreshTokenRequired,
}

impl From<Rejection> for AuthError {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::MissingCredential => AuthError::MissingCredential,
            Rejection::InvalidToken => AuthError::InvalidToken,
            Rejection::AccessTokenRequired => AuthError::AccessTokenRequired,
            Rejection::RefreshTokenRequired => AuthError::RefreshTokenRequired,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Decoded(TokenClaims),
    AccessVerified(TokenClaims),
    RefreshVerified(TokenClaims),
    Rejected(Rejection),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthState::AccessVerified(_) | AuthState::RefreshVerified(_) | AuthState::Rejected(_)
        )
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// The scheme is matched case-insensitively; an empty token is treated as
/// missing.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization?.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Extracts, decodes and kind-checks bearer tokens.
#[derive(Clone)]
pub struct TokenAuthenticator {
    codec: TokenCodec,
}

impl TokenAuthenticator {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    /// Run the machine to a terminal state and return the verified claims.
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        required: TokenKind,
    ) -> Result<TokenClaims, AuthError> {
        self.authenticate_at(authorization, required, Utc::now())
    }

    pub fn authenticate_at(
        &self,
        authorization: Option<&str>,
        required: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        let mut state = AuthState::Unauthenticated;
        while !state.is_terminal() {
            state = self.step(state, authorization, required, now);
        }
        match state {
            AuthState::AccessVerified(claims) | AuthState::RefreshVerified(claims) => Ok(claims),
            AuthState::Rejected(reason) => Err(reason.into()),
            AuthState::Unauthenticated | AuthState::Decoded(_) => {
                Err(AuthError::Internal("authenticator stopped early".into()))
            }
        }
    }

    /// Single transition.
    pub fn step(
        &self,
        state: AuthState,
        authorization: Option<&str>,
        required: TokenKind,
        now: DateTime<Utc>,
    ) -> AuthState {
        match state {
            AuthState::Unauthenticated => match bearer_token(authorization) {
                None => AuthState::Rejected(Rejection::MissingCredential),
                Some(token) => match self.codec.decode_at(token, now) {
                    Ok(claims) => AuthState::Decoded(claims),
                    Err(_) => AuthState::Rejected(Rejection::InvalidToken),
                },
            },
            AuthState::Decoded(claims) => match (required, claims.kind()) {
                (TokenKind::Access, TokenKind::Access) => AuthState::AccessVerified(claims),
                (TokenKind::Access, TokenKind::Refresh) => {
                    AuthState::Rejected(Rejection::AccessTokenRequired)
                }
                (TokenKind::Refresh, TokenKind::Refresh) => AuthState::RefreshVerified(claims),
                (TokenKind::Refresh, TokenKind::Access) => {
                    AuthState::Rejected(Rejection::RefreshTokenRequired)
                }
            },
            terminal => terminal,
        }
    }
}
