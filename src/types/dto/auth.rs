use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Request model for user login
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Email address for authentication
    pub email: String,

    /// Password for authentication
    pub password: String,
}

/// Session token issued on successful authentication
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed bearer token
    pub token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Number of seconds until the token expires
    pub expires_in: i64,
}

/// Summary of the authenticated user, including the resolved permission set
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct UserSummary {
    /// User ID (UUID)
    pub id: String,

    /// Email address
    pub email: String,

    /// Display name
    pub display_name: String,

    /// Role name
    pub role_name: String,

    /// Permission keys held by the user's role
    pub permissions: Vec<String>,
}

/// Reference to a pending second-factor challenge
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ChallengeRef {
    /// Opaque challenge reference to present together with a TOTP code
    pub challenge: String,

    /// Number of seconds until the challenge expires
    pub expires_in: i64,
}

/// Response model for login
///
/// Either `token` and `user` are present (`status = "ok"`), or `challenge`
/// is present (`status = "totp_required"`) and a code exchange must follow.
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// "ok" or "totp_required"
    pub status: String,

    /// Session token, present when no second factor is required
    pub token: Option<TokenResponse>,

    /// User summary, present when no second factor is required
    pub user: Option<UserSummary>,

    /// Pending challenge reference, present when TOTP is enabled
    pub challenge: Option<ChallengeRef>,
}

/// Request model for completing a second-factor challenge
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ChallengeRequest {
    /// Challenge reference returned by login
    pub challenge: String,

    /// 6-digit TOTP code or a backup code
    pub code: String,
}

/// Response model for whoami
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    /// User ID (UUID)
    pub user_id: String,

    /// Email address
    pub email: String,

    /// Role name
    pub role_name: String,

    /// Token expiration time (Unix timestamp)
    pub expires_at: i64,
}

/// Request model for password change
#[derive(Object, Debug, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password for verification
    pub old_password: String,

    /// New password to set
    pub new_password: String,
}
