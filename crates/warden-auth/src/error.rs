//! Authentication and session errors.

use std::fmt;

use thiserror::Error;

use warden_core::error::{AppError, ErrorKind};

/// Why a bearer token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFault {
    /// Not a well-formed token of the expected type.
    Malformed,
    /// Signature mismatch or a non-HMAC algorithm.
    InvalidSignature,
    /// Past its `exp`.
    Expired,
}

impl fmt::Display for TokenFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed"),
            Self::InvalidSignature => write!(f, "invalid signature"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Every way a login, refresh, or session check can fail.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown identifier or wrong secret.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The account exists but is disabled.
    #[error("account is inactive")]
    AccountInactive,
    /// The owning tenant may not be served right now.
    #[error("tenant is not available")]
    TenantUnavailable,
    /// A session operation was given a token that failed verification.
    #[error("invalid token: {0}")]
    InvalidToken(TokenFault),
    /// The codec could not parse the token.
    #[error("malformed token")]
    Malformed,
    /// The codec rejected the signature or algorithm.
    #[error("invalid token signature")]
    InvalidSignature,
    /// The codec found the token past its expiry.
    #[error("token has expired")]
    Expired,
    /// The token was blacklisted.
    #[error("token has been revoked")]
    Revoked,
    /// No live claim set exists for the token.
    #[error("session not found")]
    SessionNotFound,
    /// The session belongs to a different account.
    #[error("session does not belong to this account")]
    SessionMismatch,
    /// The inactivity cutoff was exceeded.
    #[error("session timed out due to inactivity")]
    SessionTimedOut,
    /// Refresh rotation failed; the caller must log in again.
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    /// A backing store failed.
    #[error("store failure: {0}")]
    Store(#[from] AppError),
    /// Signing, hashing, or serialization failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Fold a codec error into [`AuthError::InvalidToken`].
    pub fn into_invalid_token(self) -> Self {
        match self {
            Self::Malformed => Self::InvalidToken(TokenFault::Malformed),
            Self::InvalidSignature => Self::InvalidToken(TokenFault::InvalidSignature),
            Self::Expired => Self::InvalidToken(TokenFault::Expired),
            other => other,
        }
    }

    /// The session can no longer be used; re-authentication is required.
    pub fn is_session_invalid(&self) -> bool {
        matches!(
            self,
            Self::Revoked | Self::SessionNotFound | Self::SessionMismatch | Self::SessionTimedOut
        )
    }

    /// Caused by what the caller sent rather than by the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Internal(_))
    }

    /// The [`ErrorKind`] outer layers should see for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials
            | Self::InvalidToken(_)
            | Self::Malformed
            | Self::InvalidSignature
            | Self::Expired
            | Self::Revoked
            | Self::InvalidRefreshToken => ErrorKind::Authentication,
            Self::AccountInactive | Self::TenantUnavailable | Self::SessionMismatch => {
                ErrorKind::Authorization
            }
            Self::SessionNotFound | Self::SessionTimedOut => ErrorKind::Session,
            Self::Store(inner) => inner.kind,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(inner) => inner,
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}
