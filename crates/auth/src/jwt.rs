use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::{validate_claims, JwtClaims, TokenValidationError};

/// Signature verification + claim validation for bearer tokens.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>)
        -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 validator over a shared secret.
///
/// Time-window checks go through [`validate_claims`] so they stay
/// deterministic and testable; jsonwebtoken only verifies the signature.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Claims carry RFC 3339 timestamps, not numeric exp/iat.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|_| TokenValidationError::Malformed)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};
    use stockflow_core::UserId;

    fn mint(secret: &str, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> String {
        let claims = JwtClaims {
            sub: UserId::new(),
            username: "ana".to_string(),
            roles: vec![Role::Admin],
            issued_at,
            expires_at,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_well_signed_token() {
        let now = Utc::now();
        let token = mint("secret", now, now + Duration::minutes(10));
        let validator = Hs256JwtValidator::new("secret");

        let claims = validator.validate(&token, now).unwrap();
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.roles, vec![Role::Admin]);
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = Utc::now();
        let token = mint("secret", now, now + Duration::minutes(10));
        let validator = Hs256JwtValidator::new("other-secret");

        assert_eq!(
            validator.validate(&token, now).unwrap_err(),
            TokenValidationError::Malformed
        );
    }

    #[test]
    fn rejects_expired_token() {
        let now = Utc::now();
        let token = mint("secret", now - Duration::hours(2), now - Duration::hours(1));
        let validator = Hs256JwtValidator::new("secret");

        assert_eq!(
            validator.validate(&token, now).unwrap_err(),
            TokenValidationError::Expired
        );
    }

    #[test]
    fn rejects_garbage() {
        let validator = Hs256JwtValidator::new("secret");
        assert_eq!(
            validator.validate("not-a-token", Utc::now()).unwrap_err(),
            TokenValidationError::Malformed
        );
    }
}
