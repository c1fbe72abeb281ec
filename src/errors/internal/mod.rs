use thiserror::Error;

pub mod audit;
pub mod credential;
pub mod rbac;
pub mod totp;

pub use audit::AuditError;
pub use credential::CredentialError;
pub use rbac::RbacError;
pub use totp::TotpError;

/// Internal error type for store and service operations
///
/// Never exposed via the API - endpoints convert to AuthError or AdminError
/// and the detail stays in the logs.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error("Database error in {operation}: {source}")]
    Database {
        operation: String,
        source: sea_orm::DbErr,
    },

    #[error("Crypto error: {operation} failed: {message}")]
    Crypto { operation: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl InternalError {
    pub fn database(operation: &str, source: sea_orm::DbErr) -> InternalError {
        InternalError::Database {
            operation: operation.to_string(),
            source,
        }
    }

    pub fn crypto(operation: &str, message: impl Into<String>) -> InternalError {
        InternalError::Crypto {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}
