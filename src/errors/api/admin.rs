use poem_openapi::{payload::Json, ApiResponse};
use std::fmt;

use crate::errors::api::auth::AuthError;
use crate::errors::internal::{CredentialError, InternalError, RbacError};
use crate::types::dto::common::ErrorResponse;

/// Administrative operation error responses
#[derive(ApiResponse, Debug)]
pub enum AdminError {
    /// Invalid or malformed token
    #[oai(status = 401)]
    InvalidToken(Json<ErrorResponse>),

    /// Token has expired
    #[oai(status = 401)]
    ExpiredToken(Json<ErrorResponse>),

    /// Required permission not held
    #[oai(status = 403)]
    Forbidden(Json<ErrorResponse>),

    /// User not found
    #[oai(status = 404)]
    UserNotFound(Json<ErrorResponse>),

    /// Role not found
    #[oai(status = 404)]
    RoleNotFound(Json<ErrorResponse>),

    /// Permission key not found
    #[oai(status = 404)]
    PermissionNotFound(Json<ErrorResponse>),

    /// Email already registered
    #[oai(status = 409)]
    DuplicateEmail(Json<ErrorResponse>),

    /// Request rejected by validation
    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),

    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
}

impl AdminError {
    /// Create a UserNotFound error
    pub fn user_not_found(user_id: &str) -> Self {
        AdminError::UserNotFound(Json(ErrorResponse {
            error: "user_not_found".to_string(),
            message: format!("User not found: {}", user_id),
            status_code: 404,
        }))
    }

    /// Create a RoleNotFound error
    pub fn role_not_found(role_name: &str) -> Self {
        AdminError::RoleNotFound(Json(ErrorResponse {
            error: "role_not_found".to_string(),
            message: format!("Role not found: {}", role_name),
            status_code: 404,
        }))
    }

    /// Create a PermissionNotFound error
    pub fn permission_not_found(key: &str) -> Self {
        AdminError::PermissionNotFound(Json(ErrorResponse {
            error: "permission_not_found".to_string(),
            message: format!("Permission not found: {}", key),
            status_code: 404,
        }))
    }

    /// Create a DuplicateEmail error
    pub fn duplicate_email() -> Self {
        AdminError::DuplicateEmail(Json(ErrorResponse {
            error: "duplicate_email".to_string(),
            message: "Email already registered".to_string(),
            status_code: 409,
        }))
    }

    /// Create a BadRequest error
    pub fn bad_request(message: impl Into<String>) -> Self {
        AdminError::BadRequest(Json(ErrorResponse {
            error: "bad_request".to_string(),
            message: message.into(),
            status_code: 400,
        }))
    }

    /// Create an InternalError with a generic message
    pub fn internal_error() -> Self {
        AdminError::InternalError(Json(ErrorResponse {
            error: "internal_error".to_string(),
            message: "Internal server error".to_string(),
            status_code: 500,
        }))
    }

    /// Get the error message from the error variant
    pub fn message(&self) -> String {
        match self {
            AdminError::InvalidToken(json) => json.0.message.clone(),
            AdminError::ExpiredToken(json) => json.0.message.clone(),
            AdminError::Forbidden(json) => json.0.message.clone(),
            AdminError::UserNotFound(json) => json.0.message.clone(),
            AdminError::RoleNotFound(json) => json.0.message.clone(),
            AdminError::PermissionNotFound(json) => json.0.message.clone(),
            AdminError::DuplicateEmail(json) => json.0.message.clone(),
            AdminError::BadRequest(json) => json.0.message.clone(),
            AdminError::InternalError(json) => json.0.message.clone(),
        }
    }
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Map gate failures onto admin responses without changing status or code
impl From<AuthError> for AdminError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(json) => AdminError::InvalidToken(json),
            AuthError::ExpiredToken(json) => AdminError::ExpiredToken(json),
            AuthError::Forbidden(json) => AdminError::Forbidden(json),
            AuthError::InternalError(json) => AdminError::InternalError(json),
            other => {
                tracing::error!("unexpected auth error in admin flow: {}", other);
                AdminError::internal_error()
            }
        }
    }
}

impl From<InternalError> for AdminError {
    fn from(err: InternalError) -> Self {
        tracing::error!("internal error in admin flow: {}", err);
        AdminError::internal_error()
    }
}

impl From<RbacError> for AdminError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::RoleNotFound(name) => AdminError::role_not_found(&name),
            RbacError::PermissionNotFound(key) => AdminError::permission_not_found(&key),
            RbacError::Internal(err) => AdminError::from(err),
        }
    }
}

impl From<CredentialError> for AdminError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::DuplicateEmail => AdminError::duplicate_email(),
            CredentialError::UserNotFound => AdminError::UserNotFound(Json(ErrorResponse {
                error: "user_not_found".to_string(),
                message: "User not found".to_string(),
                status_code: 404,
            })),
            CredentialError::Internal(err) => AdminError::from(err),
            other => {
                tracing::error!("unexpected credential error in admin flow: {}", other);
                AdminError::internal_error()
            }
        }
    }
}
