use std::sync::Arc;

use poem_openapi::{auth::Bearer, SecurityScheme};

use crate::errors::api::auth::AuthError;
use crate::services::token_service::{TokenError, TokenService};
use crate::services::PermissionService;
use crate::types::internal::auth::Claims;

/// Bearer token authentication scheme
///
/// Endpoints that take this parameter form the protected surface; routes
/// without it (login, challenge exchange, health) are the explicit
/// unauthenticated allow-list.
#[derive(SecurityScheme)]
#[oai(
    ty = "bearer",
    key_name = "Authorization",
    key_in = "header",
    bearer_format = "JWT"
)]
pub struct BearerAuth(pub Bearer);

/// The per-request authorization decision point
///
/// Stateless between requests: everything it needs (signing secret,
/// permission cache) is process-wide and built at startup.
pub struct AuthGate {
    tokens: Arc<TokenService>,
    permissions: Arc<PermissionService>,
}

impl AuthGate {
    /// Create a new AuthGate
    pub fn new(tokens: Arc<TokenService>, permissions: Arc<PermissionService>) -> Self {
        Self {
            tokens,
            permissions,
        }
    }

    /// Validate the bearer token and return its claims
    ///
    /// Invalid and expired tokens produce distinguishable 401s so clients
    /// know whether to re-login.
    pub fn authenticate(&self, auth: &BearerAuth) -> Result<Claims, AuthError> {
        self.tokens.validate(&auth.0.token).map_err(|e| match e {
            TokenError::Expired => AuthError::expired_token(),
            TokenError::Invalid => AuthError::invalid_token(),
        })
    }

    /// Validate the token, then check the statically declared permission
    ///
    /// Authentication failures are 401, authorization failures 403; the
    /// two are never conflated.
    pub async fn require(
        &self,
        auth: &BearerAuth,
        permission_key: &str,
    ) -> Result<Claims, AuthError> {
        let claims = self.authenticate(auth)?;

        let allowed = self
            .permissions
            .has_permission(&claims.role_name, &claims.role_id, permission_key)
            .await?;

        if !allowed {
            return Err(AuthError::forbidden(permission_key));
        }

        Ok(claims)
    }
}
