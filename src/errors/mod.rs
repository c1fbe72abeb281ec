// Errors layer - API-facing responses and internal error types
pub mod api;
pub mod internal;

pub use api::{AdminError, AuthError};
pub use internal::InternalError;
