use thiserror::Error;

use super::{CredentialError, InternalError};

/// Domain errors for the TOTP second factor
#[derive(Error, Debug)]
pub enum TotpError {
    /// No secret enrolled (or enrollment not confirmed) for this user
    #[error("TOTP not enrolled")]
    NotEnrolled,

    /// Enrollment cannot start while the factor is active
    #[error("TOTP already enabled")]
    AlreadyEnabled,

    /// Confirmation requires a pending enrollment
    #[error("No pending TOTP enrollment")]
    NotPending,

    /// Code did not match any accepted time step or unused backup code
    #[error("Code rejected")]
    CodeRejected,

    /// Per-user sliding window exhausted
    #[error("Too many verification attempts")]
    RateLimited,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}
