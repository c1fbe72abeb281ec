use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Standardized error body for all endpoints
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,
}

/// Generic success message
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Success message
    pub message: String,
}
