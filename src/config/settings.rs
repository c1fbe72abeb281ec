use std::env;

/// Runtime tunables with documented defaults
///
/// Everything here is loaded once at startup from the environment; none of
/// it is secret.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Session token lifetime in hours
    pub token_ttl_hours: i64,

    /// Audience claim embedded in and required from tokens
    pub token_audience: String,

    /// Issuer claim embedded in and required from tokens
    pub token_issuer: String,

    /// Issuer shown in authenticator apps for TOTP enrollments
    pub totp_issuer: String,

    /// Maximum TOTP verification attempts per user within the window
    pub totp_max_attempts: u32,

    /// Sliding window for TOTP attempt counting, in seconds
    pub totp_window_secs: u64,

    /// Lifetime of a pending second-factor challenge, in seconds
    pub challenge_ttl_secs: u64,

    /// Bound of the background audit queue; beyond it the oldest pending
    /// non-critical entry is dropped
    pub audit_queue_bound: usize,

    /// Base URL of the external IP geolocation service; enrichment is
    /// skipped entirely when unset
    pub geo_lookup_url: Option<String>,

    /// Timeout for a single geolocation lookup, in milliseconds
    pub geo_timeout_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            token_ttl_hours: 24,
            token_audience: "stockpile-web".to_string(),
            token_issuer: "stockpile-backend".to_string(),
            totp_issuer: "Stockpile".to_string(),
            totp_max_attempts: 5,
            totp_window_secs: 300,
            challenge_ttl_secs: 300,
            audit_queue_bound: 1024,
            geo_lookup_url: None,
            geo_timeout_ms: 2000,
        }
    }
}

impl AppSettings {
    /// Load settings from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", defaults.token_ttl_hours),
            token_audience: env::var("TOKEN_AUDIENCE").unwrap_or(defaults.token_audience),
            token_issuer: env::var("TOKEN_ISSUER").unwrap_or(defaults.token_issuer),
            totp_issuer: env::var("TOTP_ISSUER").unwrap_or(defaults.totp_issuer),
            totp_max_attempts: parse_var("TOTP_MAX_ATTEMPTS", defaults.totp_max_attempts),
            totp_window_secs: parse_var("TOTP_WINDOW_SECS", defaults.totp_window_secs),
            challenge_ttl_secs: parse_var("CHALLENGE_TTL_SECS", defaults.challenge_ttl_secs),
            audit_queue_bound: parse_var("AUDIT_QUEUE_BOUND", defaults.audit_queue_bound),
            geo_lookup_url: env::var("GEO_LOOKUP_URL").ok(),
            geo_timeout_ms: parse_var("GEO_TIMEOUT_MS", defaults.geo_timeout_ms),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.token_ttl_hours, 24);
        assert_eq!(settings.totp_max_attempts, 5);
        assert_eq!(settings.totp_window_secs, 300);
        assert!(settings.geo_lookup_url.is_none());
    }
}
