use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Response model for enrollment start
///
/// The secret and backup codes are shown exactly once; only digests are
/// retained server-side.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct EnrollResponse {
    /// Base32-encoded shared secret
    pub secret: String,

    /// otpauth:// provisioning URI for authenticator apps
    pub provisioning_uri: String,

    /// Single-use backup codes
    pub backup_codes: Vec<String>,
}

/// Request model for enrollment confirmation
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ConfirmRequest {
    /// 6-digit code from the authenticator app
    pub code: String,
}
