use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::errors::api::auth::AuthError;
use crate::errors::internal::{CredentialError, TotpError};
use crate::services::audit_recorder::AuditRecorder;
use crate::services::crypto;
use crate::services::permission_service::PermissionService;
use crate::services::token_service::TokenService;
use crate::services::totp_service::{SecondFactor, TotpService};
use crate::stores::{CredentialStore, RoleStore};
use crate::types::db::{role, user};
use crate::types::internal::audit::{AuditAction, AuditEvent};
use crate::types::internal::context::RequestContext;
use crate::types::internal::permissions;

/// A finished login: token plus the user summary data the API returns
pub struct CompletedLogin {
    pub token: String,
    pub expires_in: i64,
    pub user: user::Model,
    pub role_name: String,
    pub permissions: Vec<String>,
}

/// Outcome of the password step
pub enum LoginOutcome {
    /// No second factor required; token issued
    Complete(Box<CompletedLogin>),
    /// TOTP is enabled; a challenge exchange must follow
    ChallengeRequired { challenge: String, expires_in: i64 },
}

struct PendingChallenge {
    user_id: String,
    created_at: Instant,
}

/// Orchestrates login, the second-factor challenge exchange and logout
///
/// Every outcome is audited: exactly one LOGIN entry per success and per
/// failed attempt (actor null when no identity was proven).
pub struct AuthService {
    credentials: Arc<CredentialStore>,
    roles: Arc<RoleStore>,
    permissions: Arc<PermissionService>,
    tokens: Arc<TokenService>,
    totp: Arc<TotpService>,
    audit: Arc<AuditRecorder>,
    challenges: Mutex<HashMap<String, PendingChallenge>>,
    challenge_ttl: Duration,
}

impl AuthService {
    /// Create a new AuthService
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        credentials: Arc<CredentialStore>,
        roles: Arc<RoleStore>,
        permissions: Arc<PermissionService>,
        tokens: Arc<TokenService>,
        totp: Arc<TotpService>,
        audit: Arc<AuditRecorder>,
        challenge_ttl: Duration,
    ) -> Self {
        Self {
            credentials,
            roles,
            permissions,
            tokens,
            totp,
            audit,
            challenges: Mutex::new(HashMap::new()),
            challenge_ttl,
        }
    }

    /// Password step of the login flow
    ///
    /// Returns a token immediately for accounts without a second factor,
    /// or a short-lived challenge reference for TOTP-enabled accounts.
    pub async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let user = match self.credentials.verify_credentials(email, password).await {
            Ok(user) => user,
            Err(CredentialError::AccountDisabled) => {
                // Password was proven, so the attempt is attributed
                let actor_id = self
                    .credentials
                    .find_by_email(email)
                    .await
                    .ok()
                    .flatten()
                    .map(|u| u.id);
                self.audit
                    .record_login_failure(ctx, actor_id, email, "disabled")
                    .await;
                return Err(AuthError::account_disabled());
            }
            Err(CredentialError::InvalidCredentials) => {
                self.audit
                    .record_login_failure(ctx, None, email, "invalid_credentials")
                    .await;
                return Err(AuthError::invalid_credentials());
            }
            Err(err) => return Err(AuthError::from(err)),
        };

        if user.totp_state == user::TOTP_STATE_ENABLED {
            let challenge = self.create_challenge(&user.id);
            return Ok(LoginOutcome::ChallengeRequired {
                challenge,
                expires_in: self.challenge_ttl.as_secs() as i64,
            });
        }

        let completed = self.complete_login(ctx, user, None).await?;
        Ok(LoginOutcome::Complete(Box::new(completed)))
    }

    /// Second step of the login flow for TOTP-enabled accounts
    pub async fn verify_challenge(
        &self,
        ctx: &RequestContext,
        challenge: &str,
        code: &str,
    ) -> Result<CompletedLogin, AuthError> {
        let user_id = self
            .lookup_challenge(challenge)
            .ok_or_else(AuthError::challenge_invalid)?;

        let user = self
            .credentials
            .find_by_id(&user_id)
            .await?
            .ok_or_else(AuthError::challenge_invalid)?;

        if user.status == user::STATUS_DISABLED {
            self.remove_challenge(challenge);
            self.audit
                .record_login_failure(ctx, Some(user.id.clone()), &user.email, "disabled")
                .await;
            return Err(AuthError::account_disabled());
        }

        match self.totp.verify_login(&user, code).await {
            Ok(factor) => {
                self.remove_challenge(challenge);
                self.complete_login(ctx, user, Some(factor)).await
            }
            Err(err) => {
                let reason = match &err {
                    TotpError::RateLimited => "rate_limited",
                    _ => "code_rejected",
                };
                self.audit
                    .record_challenge_failed(ctx, &user.id, reason)
                    .await;
                Err(AuthError::from(err))
            }
        }
    }

    /// Record a logout; token discard itself is client-side
    pub async fn logout(&self, ctx: &RequestContext) {
        self.audit.record_logout(ctx).await;
    }

    /// Change the caller's password after verifying the old one
    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.credentials
            .change_password(user_id, old_password, new_password)
            .await
            .map_err(AuthError::from)?;

        self.audit
            .record(
                AuditEvent::new(AuditAction::Update, "user")
                    .with_context(ctx)
                    .with_resource_id(user_id)
                    .with_detail("change", "password"),
            )
            .await;
        Ok(())
    }

    /// Resolve the permission keys to advertise for a role
    ///
    /// super_admin implicitly holds the whole catalog.
    pub async fn advertised_permissions(
        &self,
        role: &role::Model,
    ) -> Result<Vec<String>, AuthError> {
        if role.name == role::SUPER_ADMIN {
            let mut keys: Vec<String> = permissions::CATALOG
                .iter()
                .map(|(key, _, _)| (*key).to_string())
                .collect();
            keys.sort();
            return Ok(keys);
        }
        let set = self.permissions.permissions_of(&role.id).await?;
        let mut keys: Vec<String> = set.iter().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn complete_login(
        &self,
        ctx: &RequestContext,
        user: user::Model,
        second_factor: Option<SecondFactor>,
    ) -> Result<CompletedLogin, AuthError> {
        let role = self
            .roles
            .find_role_by_id(&user.role_id)
            .await?
            .ok_or_else(|| {
                tracing::error!(user_id = %user.id, role_id = %user.role_id, "user role missing");
                AuthError::internal_error()
            })?;

        let token = self
            .tokens
            .issue(&user, &role)
            .map_err(|_| AuthError::internal_error())?;

        self.credentials.record_login(&user).await?;
        self.audit
            .record_login_success(ctx, &user, second_factor.map(|f| f.as_str()))
            .await;

        let permissions = self.advertised_permissions(&role).await?;

        Ok(CompletedLogin {
            token,
            expires_in: self.tokens.expires_in_secs(),
            user,
            role_name: role.name,
            permissions,
        })
    }

    fn create_challenge(&self, user_id: &str) -> String {
        let reference = crypto::generate_opaque_ref();
        let mut challenges = self.challenges.lock().expect("challenge map poisoned");
        Self::prune(&mut challenges, self.challenge_ttl);
        challenges.insert(
            reference.clone(),
            PendingChallenge {
                user_id: user_id.to_string(),
                created_at: Instant::now(),
            },
        );
        reference
    }

    fn lookup_challenge(&self, reference: &str) -> Option<String> {
        let mut challenges = self.challenges.lock().expect("challenge map poisoned");
        Self::prune(&mut challenges, self.challenge_ttl);
        challenges.get(reference).map(|c| c.user_id.clone())
    }

    fn remove_challenge(&self, reference: &str) {
        self.challenges
            .lock()
            .expect("challenge map poisoned")
            .remove(reference);
    }

    fn prune(challenges: &mut HashMap<String, PendingChallenge>, ttl: Duration) {
        let now = Instant::now();
        challenges.retain(|_, c| now.duration_since(c.created_at) <= ttl);
    }
}
