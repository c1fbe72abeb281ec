use serde::{Deserialize, Serialize};

/// Session token claims
///
/// Possession of a validly-signed, unexpired token carrying these claims is
/// the sole session proof; nothing is stored server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Email of the subject
    pub email: String,

    /// Display name of the subject
    pub name: String,

    /// Role id at issuance time
    pub role_id: String,

    /// Role name at issuance time
    pub role_name: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,

    /// Token identifier
    pub jti: String,
}
