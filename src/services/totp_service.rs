use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use totp_rs::{Algorithm, Secret, TOTP};

use crate::errors::internal::{InternalError, TotpError};
use crate::stores::CredentialStore;
use crate::types::db::user;

/// RFC 6238 parameters: 6 digits, 30-second step, ±1 step skew
const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP_SECS: u64 = 30;
/// Backup codes generated per enrollment
const BACKUP_CODE_COUNT: usize = 10;

/// Which second factor satisfied a login challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondFactor {
    TotpCode,
    BackupCode,
}

impl SecondFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotpCode => "totp",
            Self::BackupCode => "backup_code",
        }
    }
}

/// Result of starting an enrollment; shown to the user exactly once
#[derive(Debug)]
pub struct Enrollment {
    pub secret: String,
    pub provisioning_uri: String,
    pub backup_codes: Vec<String>,
}

/// Sliding-window attempt counter per user
///
/// The one piece of per-user mutable state shared across requests;
/// check-and-record happens atomically under the lock.
struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Record one attempt; returns false when the window is exhausted
    fn check_and_record(&self, user_id: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().expect("rate limiter poisoned");
        let window = attempts.entry(user_id.to_string()).or_default();

        while let Some(front) = window.front() {
            if now.duration_since(*front) > self.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.max_attempts as usize {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Forget a user's attempts after a successful verification
    fn reset(&self, user_id: &str) {
        self.attempts
            .lock()
            .expect("rate limiter poisoned")
            .remove(user_id);
    }
}

/// Manages the TOTP second factor: enrollment, login verification, backup
/// codes
///
/// Per-user state machine: Disabled -> PendingEnrollment -> Enabled ->
/// Disabled. A pending secret is not trusted for login until one code has
/// been verified against it.
pub struct TotpService {
    credentials: Arc<CredentialStore>,
    issuer: String,
    limiter: RateLimiter,
}

impl TotpService {
    /// Create a new TotpService
    ///
    /// # Arguments
    /// * `credentials` - The credential store holding secrets and codes
    /// * `issuer` - Issuer label shown in authenticator apps
    /// * `max_attempts` / `window` - Per-user rate limit for login codes
    pub fn new(
        credentials: Arc<CredentialStore>,
        issuer: String,
        max_attempts: u32,
        window: Duration,
    ) -> Self {
        Self {
            credentials,
            issuer,
            limiter: RateLimiter::new(max_attempts, window),
        }
    }

    /// Begin enrollment: fresh secret, provisioning URI, backup codes
    ///
    /// The secret is stored but not yet trusted; state becomes pending.
    /// Restarting a pending enrollment regenerates everything.
    pub async fn start_enrollment(&self, user: &user::Model) -> Result<Enrollment, TotpError> {
        if user.totp_state == user::TOTP_STATE_ENABLED {
            return Err(TotpError::AlreadyEnabled);
        }

        let secret = Secret::generate_secret();
        let base32 = secret.to_encoded().to_string();
        let totp = self.build_totp(&base32, &user.email)?;

        self.credentials.set_totp_pending(&user.id, &base32).await?;
        let backup_codes = self
            .credentials
            .replace_backup_codes(&user.id, BACKUP_CODE_COUNT)
            .await?;

        Ok(Enrollment {
            secret: base32,
            provisioning_uri: totp.get_url(),
            backup_codes,
        })
    }

    /// Confirm a pending enrollment with a code from the authenticator
    ///
    /// On match the secret becomes active; on mismatch the state stays
    /// pending and the caller audits the attempt.
    pub async fn confirm_enrollment(&self, user: &user::Model, code: &str) -> Result<(), TotpError> {
        if user.totp_state != user::TOTP_STATE_PENDING {
            return Err(TotpError::NotPending);
        }
        let secret = user.totp_secret.as_deref().ok_or(TotpError::NotPending)?;

        if !self.check_code(secret, &user.email, code)? {
            return Err(TotpError::CodeRejected);
        }

        self.credentials.set_totp_enabled(&user.id).await?;
        Ok(())
    }

    /// Verify a second-factor code during login
    ///
    /// Accepts a code matching the current or adjacent time step, or an
    /// unconsumed backup code (which is then spent). Attempts are counted
    /// against the per-user sliding window before verification.
    pub async fn verify_login(
        &self,
        user: &user::Model,
        code: &str,
    ) -> Result<SecondFactor, TotpError> {
        if user.totp_state != user::TOTP_STATE_ENABLED {
            return Err(TotpError::NotEnrolled);
        }
        let secret = user.totp_secret.as_deref().ok_or(TotpError::NotEnrolled)?;

        if !self.limiter.check_and_record(&user.id) {
            return Err(TotpError::RateLimited);
        }

        if self.check_code(secret, &user.email, code)? {
            self.limiter.reset(&user.id);
            return Ok(SecondFactor::TotpCode);
        }

        if self.credentials.consume_backup_code(&user.id, code).await? {
            self.limiter.reset(&user.id);
            return Ok(SecondFactor::BackupCode);
        }

        Err(TotpError::CodeRejected)
    }

    /// Disable the second factor: clears the secret and all backup codes
    ///
    /// Callers must already hold a valid session; this is never reachable
    /// unauthenticated.
    pub async fn disable(&self, user: &user::Model) -> Result<(), TotpError> {
        self.credentials.clear_totp(&user.id).await?;
        Ok(())
    }

    fn build_totp(&self, base32_secret: &str, account: &str) -> Result<TOTP, TotpError> {
        let secret_bytes = Secret::Encoded(base32_secret.to_string())
            .to_bytes()
            .map_err(|e| InternalError::crypto("totp_secret_decode", format!("{:?}", e)))?;

        let totp = TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP_SECS,
            secret_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| InternalError::crypto("totp_init", e.to_string()))?;

        Ok(totp)
    }

    fn check_code(&self, base32_secret: &str, account: &str, code: &str) -> Result<bool, TotpError> {
        let totp = self.build_totp(base32_secret, account)?;
        let ok = totp
            .check_current(code)
            .map_err(|e| InternalError::crypto("totp_check", e.to_string()))?;
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_blocks_after_max_attempts() {
        let limiter = RateLimiter::new(3, Duration::from_secs(300));

        assert!(limiter.check_and_record("user-1"));
        assert!(limiter.check_and_record("user-1"));
        assert!(limiter.check_and_record("user-1"));
        assert!(!limiter.check_and_record("user-1"));

        // Another user is unaffected
        assert!(limiter.check_and_record("user-2"));
    }

    #[test]
    fn test_rate_limiter_reset_clears_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(300));

        assert!(limiter.check_and_record("user-1"));
        assert!(limiter.check_and_record("user-1"));
        assert!(!limiter.check_and_record("user-1"));

        limiter.reset("user-1");
        assert!(limiter.check_and_record("user-1"));
    }

    #[test]
    fn test_rate_limiter_window_expires() {
        let limiter = RateLimiter::new(1, Duration::from_millis(0));

        assert!(limiter.check_and_record("user-1"));
        // Zero-length window: the previous attempt ages out immediately
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.check_and_record("user-1"));
    }

    #[test]
    fn test_generated_code_verifies() {
        let secret = Secret::generate_secret();
        let base32 = secret.to_encoded().to_string();

        let service = TotpService::new(
            Arc::new(CredentialStore::new(
                sea_orm::DatabaseConnection::default(),
                "test-pepper".to_string(),
            )),
            "Stockpile".to_string(),
            5,
            Duration::from_secs(300),
        );

        let totp = service.build_totp(&base32, "alice@example.com").unwrap();
        let code = totp.generate_current().unwrap();

        assert!(service
            .check_code(&base32, "alice@example.com", &code)
            .unwrap());
        assert!(!service
            .check_code(&base32, "alice@example.com", "000000")
            .unwrap());
    }

    #[test]
    fn test_provisioning_uri_contains_issuer_and_account() {
        let secret = Secret::generate_secret();
        let base32 = secret.to_encoded().to_string();

        let service = TotpService::new(
            Arc::new(CredentialStore::new(
                sea_orm::DatabaseConnection::default(),
                "test-pepper".to_string(),
            )),
            "Stockpile".to_string(),
            5,
            Duration::from_secs(300),
        );

        let totp = service.build_totp(&base32, "alice@example.com").unwrap();
        let uri = totp.get_url();

        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("Stockpile"));
        assert!(uri.contains("alice"));
    }
}
