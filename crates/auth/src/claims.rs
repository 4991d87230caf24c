use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockflow_core::UserId;

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims expected once a token has been decoded and its
/// signature verified. Token *issuance* lives outside this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Display name carried for receipts and listings.
    pub username: String,

    /// Roles granted to the subject.
    pub roles: Vec<Role>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or badly signed token")]
    Malformed,
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification/decoding
/// is handled by [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            username: "ana".to_string(),
            roles: vec![Role::User],
            issued_at,
            expires_at,
        }
    }

    #[test]
    fn accepts_claims_inside_window() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(1), now + Duration::minutes(10));
        validate_claims(&c, now).unwrap();
    }

    #[test]
    fn rejects_expired_claims() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(20), now - Duration::minutes(10));
        assert_eq!(
            validate_claims(&c, now).unwrap_err(),
            TokenValidationError::Expired
        );
    }

    #[test]
    fn rejects_not_yet_valid_claims() {
        let now = Utc::now();
        let c = claims(now + Duration::minutes(5), now + Duration::minutes(15));
        assert_eq!(
            validate_claims(&c, now).unwrap_err(),
            TokenValidationError::NotYetValid
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let now = Utc::now();
        let c = claims(now, now);
        assert_eq!(
            validate_claims(&c, now).unwrap_err(),
            TokenValidationError::InvalidTimeWindow
        );
    }
}
