use thiserror::Error;

use super::InternalError;

/// Domain errors for role/permission operations
#[derive(Error, Debug)]
pub enum RbacError {
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    #[error(transparent)]
    Internal(#[from] InternalError),
}
