use thiserror::Error;

use super::InternalError;

/// Domain errors for credential operations
///
/// Unknown email and wrong password collapse into `InvalidCredentials`
/// before leaving the store, so callers cannot distinguish them.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Internal(#[from] InternalError),
}
