use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::fmt;
use uuid::Uuid;

use crate::types::db::{role, user};
use crate::types::internal::auth::Claims;

/// Token validation failures, distinguished so callers can decide between
/// prompting re-login (expired) and rejecting outright (invalid).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Invalid,
    Expired,
}

/// Manages session token issuance and validation
///
/// Tokens are signed, time-bounded bearer credentials; nothing is stored
/// server-side and there is no revocation list. The signing secret is
/// loaded once at startup and never rotated at runtime.
pub struct TokenService {
    jwt_secret: String,
    ttl_hours: i64,
    audience: String,
    issuer: String,
}

impl TokenService {
    /// Create a new TokenService
    ///
    /// # Arguments
    /// * `jwt_secret` - Server-held signing secret
    /// * `ttl_hours` - Token lifetime in hours
    /// * `audience` - Audience claim required on validation
    /// * `issuer` - Issuer claim required on validation
    pub fn new(jwt_secret: String, ttl_hours: i64, audience: String, issuer: String) -> Self {
        Self {
            jwt_secret,
            ttl_hours,
            audience,
            issuer,
        }
    }

    /// Issue a signed token for the given user and role
    pub fn issue(&self, user: &user::Model, role: &role::Model) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            role_id: role.id.clone(),
            role_name: role.name.clone(),
            iat: now,
            exp: now + self.ttl_hours * 3600,
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("token encoding failed: {}", e);
            TokenError::Invalid
        })
    }

    /// Validate a token: signature, then expiry, then audience and issuer
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })?;

        Ok(token_data.claims)
    }

    /// Token lifetime in seconds, for the `expires_in` response field
    pub fn expires_in_secs(&self) -> i64 {
        self.ttl_hours * 3600
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("jwt_secret", &"<redacted>")
            .field("ttl_hours", &self.ttl_hours)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(
            "test-secret-key-minimum-32-characters-long".to_string(),
            24,
            "stockpile-web".to_string(),
            "stockpile-backend".to_string(),
        )
    }

    fn test_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4().to_string(),
            email: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
            password_hash: String::new(),
            role_id: "role-1".to_string(),
            status: user::STATUS_ACTIVE.to_string(),
            totp_secret: None,
            totp_state: user::TOTP_STATE_DISABLED.to_string(),
            login_count: 0,
            last_login_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn test_role() -> role::Model {
        role::Model {
            id: "role-1".to_string(),
            name: "clerk".to_string(),
            display_name: "Clerk".to_string(),
        }
    }

    #[test]
    fn test_issue_and_validate_roundtrip() {
        let service = test_service();
        let user = test_user();
        let role = test_role();

        let token = service.issue(&user, &role).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role_id, "role-1");
        assert_eq!(claims.role_name, "clerk");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_validate_fails_with_wrong_secret() {
        let service = test_service();
        let other = TokenService::new(
            "different-secret-key-minimum-32-chars-x".to_string(),
            24,
            "stockpile-web".to_string(),
            "stockpile-backend".to_string(),
        );

        let token = service.issue(&test_user(), &test_role()).unwrap();
        assert_eq!(other.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_validate_fails_with_wrong_audience() {
        let service = test_service();
        let other = TokenService::new(
            "test-secret-key-minimum-32-characters-long".to_string(),
            24,
            "different-audience".to_string(),
            "stockpile-backend".to_string(),
        );

        let token = service.issue(&test_user(), &test_role()).unwrap();
        assert_eq!(other.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_validate_fails_with_wrong_issuer() {
        let service = test_service();
        let other = TokenService::new(
            "test-secret-key-minimum-32-characters-long".to_string(),
            24,
            "stockpile-web".to_string(),
            "different-issuer".to_string(),
        );

        let token = service.issue(&test_user(), &test_role()).unwrap();
        assert_eq!(other.validate(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let service = test_service();
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: "user-1".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role_id: "role-1".to_string(),
            role_name: "clerk".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            aud: "stockpile-web".to_string(),
            iss: "stockpile-backend".to_string(),
            jti: Uuid::new_v4().to_string(),
        };

        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret("test-secret-key-minimum-32-characters-long".as_bytes()),
        )
        .unwrap();

        assert_eq!(service.validate(&expired), Err(TokenError::Expired));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let service = test_service();
        assert_eq!(
            service.validate("not-even-a-token"),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_debug_does_not_expose_secret() {
        let service = test_service();
        let debug_output = format!("{:?}", service);
        assert!(!debug_output.contains("test-secret-key"));
        assert!(debug_output.contains("<redacted>"));
    }
}
