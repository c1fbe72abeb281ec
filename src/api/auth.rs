use std::sync::Arc;

use poem::Request;
use poem_openapi::{payload::Json, OpenApi, Tags};

use crate::api::helpers::{AuthGate, BearerAuth};
use crate::api::Api;
use crate::errors::api::auth::AuthError;
use crate::services::auth_service::{AuthService, CompletedLogin, LoginOutcome};
use crate::types::dto::auth::{
    ChallengeRef, ChallengeRequest, ChangePasswordRequest, LoginRequest, LoginResponse,
    TokenResponse, UserSummary, WhoAmIResponse,
};
use crate::types::dto::common::MessageResponse;

/// API tags for authentication endpoints
#[derive(Tags)]
enum AuthTags {
    /// Login, second-factor exchange and session introspection
    Authentication,
}

/// Authentication API endpoints
pub struct AuthApi {
    auth_service: Arc<AuthService>,
    gate: Arc<AuthGate>,
}

impl Api for AuthApi {}

impl AuthApi {
    /// Create a new AuthApi
    pub fn new(auth_service: Arc<AuthService>, gate: Arc<AuthGate>) -> Self {
        Self { auth_service, gate }
    }

    fn completed_response(completed: CompletedLogin) -> LoginResponse {
        LoginResponse {
            status: "ok".to_string(),
            token: Some(TokenResponse {
                token: completed.token,
                token_type: "Bearer".to_string(),
                expires_in: completed.expires_in,
            }),
            user: Some(UserSummary {
                id: completed.user.id,
                email: completed.user.email,
                display_name: completed.user.display_name,
                role_name: completed.role_name,
                permissions: completed.permissions,
            }),
            challenge: None,
        }
    }
}

#[OpenApi(prefix_path = "/auth")]
impl AuthApi {
    /// Login with email and password
    ///
    /// Returns a token for accounts without a second factor. For
    /// TOTP-enabled accounts it returns a challenge reference instead; the
    /// token is issued by the challenge endpoint.
    #[oai(path = "/login", method = "post", tag = "AuthTags::Authentication")]
    async fn login(
        &self,
        req: &Request,
        body: Json<LoginRequest>,
    ) -> Result<Json<LoginResponse>, AuthError> {
        let ctx = self.anonymous_context(req);

        match self
            .auth_service
            .login(&ctx, &body.email, &body.password)
            .await?
        {
            LoginOutcome::Complete(completed) => Ok(Json(Self::completed_response(*completed))),
            LoginOutcome::ChallengeRequired {
                challenge,
                expires_in,
            } => Ok(Json(LoginResponse {
                status: "totp_required".to_string(),
                token: None,
                user: None,
                challenge: Some(ChallengeRef {
                    challenge,
                    expires_in,
                }),
            })),
        }
    }

    /// Complete a pending second-factor challenge
    #[oai(path = "/challenge", method = "post", tag = "AuthTags::Authentication")]
    async fn challenge(
        &self,
        req: &Request,
        body: Json<ChallengeRequest>,
    ) -> Result<Json<LoginResponse>, AuthError> {
        let ctx = self.anonymous_context(req);

        let completed = self
            .auth_service
            .verify_challenge(&ctx, &body.challenge, &body.code)
            .await?;

        Ok(Json(Self::completed_response(completed)))
    }

    /// Logout
    ///
    /// Records the logout; the token itself stays valid until expiry and
    /// is discarded client-side.
    #[oai(path = "/logout", method = "post", tag = "AuthTags::Authentication")]
    async fn logout(
        &self,
        req: &Request,
        auth: BearerAuth,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let claims = self.gate.authenticate(&auth)?;
        let ctx = self.authenticated_context(req, &claims);

        self.auth_service.logout(&ctx).await;

        Ok(Json(MessageResponse {
            message: "Logged out".to_string(),
        }))
    }

    /// Return the authenticated identity
    #[oai(path = "/whoami", method = "get", tag = "AuthTags::Authentication")]
    async fn whoami(&self, auth: BearerAuth) -> Result<Json<WhoAmIResponse>, AuthError> {
        let claims = self.gate.authenticate(&auth)?;

        Ok(Json(WhoAmIResponse {
            user_id: claims.sub,
            email: claims.email,
            role_name: claims.role_name,
            expires_at: claims.exp,
        }))
    }

    /// Change the caller's password
    #[oai(path = "/password", method = "post", tag = "AuthTags::Authentication")]
    async fn change_password(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<ChangePasswordRequest>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let claims = self.gate.authenticate(&auth)?;
        let ctx = self.authenticated_context(req, &claims);

        self.auth_service
            .change_password(&ctx, &claims.sub, &body.old_password, &body.new_password)
            .await?;

        Ok(Json(MessageResponse {
            message: "Password changed".to_string(),
        }))
    }
}
