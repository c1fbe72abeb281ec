use std::fmt;

use super::ConfigError;

const MIN_SECRET_LENGTH: usize = 32;

/// Process-wide secret material, loaded once at startup
///
/// Injected into the services that need it rather than read ad hoc from the
/// environment, so tests can construct instances with alternate values.
pub struct Secrets {
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,

    /// Argon2 secret parameter for password hashing, also keys the
    /// HMAC digests of TOTP backup codes
    pub password_pepper: String,
}

impl Secrets {
    /// Load all secrets from the environment
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is missing or shorter than the
    /// 32-character minimum.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: required("JWT_SECRET")?,
            password_pepper: required("PASSWORD_PEPPER")?,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    let value =
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::SecretTooShort {
            name: name.to_string(),
            min: MIN_SECRET_LENGTH,
        });
    }
    Ok(value)
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("jwt_secret", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_does_not_expose_secrets() {
        let secrets = Secrets {
            jwt_secret: "super-secret-jwt-key-minimum-32-chars".to_string(),
            password_pepper: "super-secret-pepper-minimum-32-chars".to_string(),
        };

        let debug_output = format!("{:?}", secrets);

        assert!(!debug_output.contains("super-secret-jwt-key"));
        assert!(!debug_output.contains("super-secret-pepper"));
        assert!(debug_output.contains("<redacted>"));
    }

    #[test]
    fn test_required_rejects_short_values() {
        std::env::set_var("TEST_SHORT_SECRET", "short");
        let result = required("TEST_SHORT_SECRET");
        assert!(matches!(result, Err(ConfigError::SecretTooShort { .. })));
        std::env::remove_var("TEST_SHORT_SECRET");
    }
}
