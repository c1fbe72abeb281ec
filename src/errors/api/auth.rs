use poem_openapi::{payload::Json, ApiResponse};
use std::fmt;

use crate::errors::internal::{CredentialError, InternalError, TotpError};
use crate::types::dto::common::ErrorResponse;

/// Authentication and authorization error responses
///
/// 401 means "prove who you are again"; 403 means "you are known but not
/// allowed". The two are never conflated. Messages carry no internal detail
/// and never reveal whether an email exists.
#[derive(ApiResponse, Debug)]
pub enum AuthError {
    /// Invalid email or password (indistinguishable on purpose)
    #[oai(status = 401)]
    InvalidCredentials(Json<ErrorResponse>),

    /// Account is disabled
    #[oai(status = 401)]
    AccountDisabled(Json<ErrorResponse>),

    /// Invalid or malformed token
    #[oai(status = 401)]
    InvalidToken(Json<ErrorResponse>),

    /// Token has expired
    #[oai(status = 401)]
    ExpiredToken(Json<ErrorResponse>),

    /// Required permission not held
    #[oai(status = 403)]
    Forbidden(Json<ErrorResponse>),

    /// Second-factor code or challenge reference rejected
    #[oai(status = 401)]
    ChallengeInvalid(Json<ErrorResponse>),

    /// Too many second-factor attempts
    #[oai(status = 429)]
    ChallengeRateLimited(Json<ErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
}

impl AuthError {
    /// Create an InvalidCredentials error
    ///
    /// The same shape is returned for unknown email and wrong password so
    /// that account existence cannot be probed.
    pub fn invalid_credentials() -> Self {
        AuthError::InvalidCredentials(Json(ErrorResponse {
            error: "invalid_credentials".to_string(),
            message: "Invalid email or password".to_string(),
            status_code: 401,
        }))
    }

    /// Create an AccountDisabled error
    pub fn account_disabled() -> Self {
        AuthError::AccountDisabled(Json(ErrorResponse {
            error: "account_disabled".to_string(),
            message: "Account is disabled".to_string(),
            status_code: 401,
        }))
    }

    /// Create an InvalidToken error
    pub fn invalid_token() -> Self {
        AuthError::InvalidToken(Json(ErrorResponse {
            error: "invalid_token".to_string(),
            message: "Invalid or malformed token".to_string(),
            status_code: 401,
        }))
    }

    /// Create an ExpiredToken error
    pub fn expired_token() -> Self {
        AuthError::ExpiredToken(Json(ErrorResponse {
            error: "expired_token".to_string(),
            message: "Token has expired".to_string(),
            status_code: 401,
        }))
    }

    /// Create a Forbidden error for a missing permission
    pub fn forbidden(permission_key: &str) -> Self {
        AuthError::Forbidden(Json(ErrorResponse {
            error: "insufficient_permission".to_string(),
            message: format!("Permission required: {}", permission_key),
            status_code: 403,
        }))
    }

    /// Create a ChallengeInvalid error
    ///
    /// Covers unknown/expired challenge references and rejected codes with
    /// a single shape.
    pub fn challenge_invalid() -> Self {
        AuthError::ChallengeInvalid(Json(ErrorResponse {
            error: "challenge_invalid".to_string(),
            message: "Challenge or code rejected".to_string(),
            status_code: 401,
        }))
    }

    /// Create a ChallengeRateLimited error
    pub fn challenge_rate_limited() -> Self {
        AuthError::ChallengeRateLimited(Json(ErrorResponse {
            error: "challenge_rate_limited".to_string(),
            message: "Too many attempts, try again later".to_string(),
            status_code: 429,
        }))
    }

    /// Create an InternalError with a generic message
    ///
    /// The underlying cause is logged, never returned to the client.
    pub fn internal_error() -> Self {
        AuthError::InternalError(Json(ErrorResponse {
            error: "internal_error".to_string(),
            message: "Internal server error".to_string(),
            status_code: 500,
        }))
    }

    /// Get the error message from the error variant
    pub fn message(&self) -> String {
        match self {
            AuthError::InvalidCredentials(json) => json.0.message.clone(),
            AuthError::AccountDisabled(json) => json.0.message.clone(),
            AuthError::InvalidToken(json) => json.0.message.clone(),
            AuthError::ExpiredToken(json) => json.0.message.clone(),
            AuthError::Forbidden(json) => json.0.message.clone(),
            AuthError::ChallengeInvalid(json) => json.0.message.clone(),
            AuthError::ChallengeRateLimited(json) => json.0.message.clone(),
            AuthError::InternalError(json) => json.0.message.clone(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<InternalError> for AuthError {
    fn from(err: InternalError) -> Self {
        tracing::error!("internal error in auth flow: {}", err);
        AuthError::internal_error()
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidCredentials => AuthError::invalid_credentials(),
            CredentialError::AccountDisabled => AuthError::account_disabled(),
            // Not reachable from login flows
            CredentialError::DuplicateEmail => AuthError::invalid_credentials(),
            CredentialError::UserNotFound => AuthError::invalid_credentials(),
            CredentialError::Internal(err) => AuthError::from(err),
        }
    }
}

impl From<TotpError> for AuthError {
    fn from(err: TotpError) -> Self {
        match err {
            TotpError::RateLimited => AuthError::challenge_rate_limited(),
            TotpError::CodeRejected
            | TotpError::NotEnrolled
            | TotpError::AlreadyEnabled
            | TotpError::NotPending => AuthError::challenge_invalid(),
            TotpError::Credential(err) => AuthError::from(err),
            TotpError::Internal(err) => AuthError::from(err),
        }
    }
}
