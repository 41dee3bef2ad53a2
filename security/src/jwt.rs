// security/src/jwt.rs

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use models::identifiers::RecordId;
use models::medical::{Identity, Role};

use crate::AuthError;

/// Claims for JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (identity id)
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn subject(&self) -> Result<RecordId, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::JwtError("Token subject is not an identity id".to_string()))
    }
}

/// Signs and checks HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Generates a JWT token.
    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id().to_string(),
            role: identity.role(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::JwtError(format!("Failed to encode JWT: {}", e)))
    }

    /// Decodes and validates a JWT token.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::JwtError(format!("Failed to decode or validate JWT: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn assistant() -> Identity {
        Identity::new_staff(Role::Assistant, "Sara".into(), "0100".into(), "sara@lab.example", "h".into())
            .unwrap()
    }

    #[test]
    fn issued_token_carries_subject_and_role() {
        let issuer = TokenIssuer::new(SECRET, 168);
        let identity = assistant();
        let claims = issuer.validate(&issuer.issue(&identity).unwrap()).unwrap();
        assert_eq!(claims.subject().unwrap(), identity.id());
        assert_eq!(claims.role, Role::Assistant);
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenIssuer::new(SECRET, 1).issue(&assistant()).unwrap();
        let other = TokenIssuer::new("fedcba9876543210fedcba9876543210", 1);
        assert!(matches!(other.validate(&token), Err(AuthError::JwtError(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new(SECRET, -1);
        let token = issuer.issue(&assistant()).unwrap();
        assert!(issuer.validate(&token).is_err());
    }
}
