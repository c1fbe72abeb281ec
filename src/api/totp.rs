use std::sync::Arc;

use poem::Request;
use poem_openapi::{payload::Json, OpenApi, Tags};

use crate::api::helpers::{AuthGate, BearerAuth};
use crate::api::Api;
use crate::errors::api::auth::AuthError;
use crate::services::{AuditRecorder, TotpService};
use crate::stores::CredentialStore;
use crate::types::db::user;
use crate::types::dto::common::MessageResponse;
use crate::types::dto::totp::{ConfirmRequest, EnrollResponse};
use crate::types::internal::audit::{AuditAction, AuditEvent};

#[derive(Tags)]
enum TotpTags {
    /// Second-factor enrollment and management
    TwoFactor,
}

/// TOTP second-factor API endpoints
///
/// All of these require an authenticated session; in particular, disable
/// cannot be used to strip the factor from an account without first
/// logging in through it.
pub struct TotpApi {
    credentials: Arc<CredentialStore>,
    totp_service: Arc<TotpService>,
    audit: Arc<AuditRecorder>,
    gate: Arc<AuthGate>,
}

impl Api for TotpApi {}

impl TotpApi {
    /// Create a new TotpApi
    pub fn new(
        credentials: Arc<CredentialStore>,
        totp_service: Arc<TotpService>,
        audit: Arc<AuditRecorder>,
        gate: Arc<AuthGate>,
    ) -> Self {
        Self {
            credentials,
            totp_service,
            audit,
            gate,
        }
    }

    async fn load_user(&self, user_id: &str) -> Result<user::Model, AuthError> {
        self.credentials
            .find_by_id(user_id)
            .await?
            .ok_or_else(AuthError::invalid_token)
    }
}

#[OpenApi(prefix_path = "/totp")]
impl TotpApi {
    /// Start enrollment
    ///
    /// Returns the secret, provisioning URI and backup codes exactly once.
    /// The factor is not active until a code is confirmed.
    #[oai(path = "/enroll", method = "post", tag = "TotpTags::TwoFactor")]
    async fn enroll(
        &self,
        req: &Request,
        auth: BearerAuth,
    ) -> Result<Json<EnrollResponse>, AuthError> {
        let claims = self.gate.authenticate(&auth)?;
        let ctx = self.authenticated_context(req, &claims);
        let user = self.load_user(&claims.sub).await?;

        let enrollment = self.totp_service.start_enrollment(&user).await?;

        self.audit
            .record(
                AuditEvent::new(AuditAction::TotpEnrollStart, "user")
                    .with_context(&ctx)
                    .with_resource_id(user.id),
            )
            .await;

        Ok(Json(EnrollResponse {
            secret: enrollment.secret,
            provisioning_uri: enrollment.provisioning_uri,
            backup_codes: enrollment.backup_codes,
        }))
    }

    /// Confirm a pending enrollment with a code
    #[oai(path = "/confirm", method = "post", tag = "TotpTags::TwoFactor")]
    async fn confirm(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<ConfirmRequest>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let claims = self.gate.authenticate(&auth)?;
        let ctx = self.authenticated_context(req, &claims);
        let user = self.load_user(&claims.sub).await?;

        let outcome = self.totp_service.confirm_enrollment(&user, &body.code).await;

        self.audit
            .record(
                AuditEvent::new(AuditAction::TotpEnrollConfirm, "user")
                    .with_context(&ctx)
                    .with_resource_id(user.id)
                    .with_detail("outcome", if outcome.is_ok() { "success" } else { "failure" }),
            )
            .await;

        outcome?;
        Ok(Json(MessageResponse {
            message: "Second factor enabled".to_string(),
        }))
    }

    /// Disable the second factor
    ///
    /// Clears the secret and all backup codes.
    #[oai(path = "/disable", method = "post", tag = "TotpTags::TwoFactor")]
    async fn disable(
        &self,
        req: &Request,
        auth: BearerAuth,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let claims = self.gate.authenticate(&auth)?;
        let ctx = self.authenticated_context(req, &claims);
        let user = self.load_user(&claims.sub).await?;

        self.totp_service.disable(&user).await?;

        self.audit
            .record(
                AuditEvent::new(AuditAction::TotpDisable, "user")
                    .with_context(&ctx)
                    .with_resource_id(user.id),
            )
            .await;

        Ok(Json(MessageResponse {
            message: "Second factor disabled".to_string(),
        }))
    }
}
