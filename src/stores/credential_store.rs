use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher,
    PasswordVerifier, Version,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, Unchanged,
};
use uuid::Uuid;

use crate::errors::internal::{CredentialError, InternalError};
use crate::services::crypto;
use crate::types::db::totp_backup_code::{self, Entity as TotpBackupCode};
use crate::types::db::user::{self, Entity as User};

/// Prefix of password records imported from the previous system; migrated
/// to Argon2id on first successful login.
const LEGACY_HASH_PREFIX: &str = "sha256$";

/// CredentialStore owns user records and password verification
pub struct CredentialStore {
    db: DatabaseConnection,
    password_pepper: String,
}

impl CredentialStore {
    /// Create a new CredentialStore
    ///
    /// # Arguments
    /// * `db` - The database connection
    /// * `password_pepper` - The secret key used as the Argon2 secret
    ///   parameter and to key backup-code digests
    pub fn new(db: DatabaseConnection, password_pepper: String) -> Self {
        Self {
            db,
            password_pepper,
        }
    }

    fn argon2(&self) -> Result<Argon2<'_>, InternalError> {
        Argon2::new_with_secret(
            self.password_pepper.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| InternalError::crypto("argon2_init", e.to_string()))
    }

    /// Hash a password with Argon2id and a fresh salt
    pub fn hash_password(&self, password: &str) -> Result<String, InternalError> {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| InternalError::crypto("password_hash", e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Provision a new user
    ///
    /// # Returns
    /// * `Ok(user::Model)` - The created user
    /// * `Err(CredentialError::DuplicateEmail)` - Email already registered
    pub async fn create_user(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        role_id: &str,
    ) -> Result<user::Model, CredentialError> {
        let existing = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_by_email", e))?;

        if existing.is_some() {
            return Err(CredentialError::DuplicateEmail);
        }

        let now = Utc::now().timestamp();
        let new_user = user::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            email: Set(email.to_string()),
            display_name: Set(display_name.to_string()),
            password_hash: Set(self.hash_password(password)?),
            role_id: Set(role_id.to_string()),
            status: Set(user::STATUS_ACTIVE.to_string()),
            totp_secret: Set(None),
            totp_state: Set(user::TOTP_STATE_DISABLED.to_string()),
            login_count: Set(0),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = new_user.insert(&self.db).await.map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                CredentialError::DuplicateEmail
            } else {
                CredentialError::Internal(InternalError::database("insert_user", e))
            }
        })?;

        Ok(model)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, InternalError> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_by_email", e))
    }

    /// Find a user by id
    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<user::Model>, InternalError> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| InternalError::database("find_user_by_id", e))
    }

    /// Verify credentials and return the user on success
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`.
    /// A disabled account passes the password check and is then rejected
    /// with `AccountDisabled`, so the caller can audit the attempt against
    /// the proven identity.
    ///
    /// Legacy `sha256$` records are re-hashed with Argon2id in place after
    /// a successful verification.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, CredentialError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(CredentialError::InvalidCredentials)?;

        if let Some(legacy_digest) = user.password_hash.strip_prefix(LEGACY_HASH_PREFIX) {
            if !crypto::constant_time_eq(&crypto::sha256_hex(password), legacy_digest) {
                return Err(CredentialError::InvalidCredentials);
            }
            self.migrate_legacy_hash(&user.id, password).await?;
        } else {
            let parsed_hash = PasswordHash::new(&user.password_hash)
                .map_err(|_| CredentialError::InvalidCredentials)?;
            self.argon2()?
                .verify_password(password.as_bytes(), &parsed_hash)
                .map_err(|_| CredentialError::InvalidCredentials)?;
        }

        if user.status == user::STATUS_DISABLED {
            return Err(CredentialError::AccountDisabled);
        }

        Ok(user)
    }

    async fn migrate_legacy_hash(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<(), InternalError> {
        let rehashed = self.hash_password(password)?;
        let update = user::ActiveModel {
            id: Unchanged(user_id.to_string()),
            password_hash: Set(rehashed),
            updated_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };
        update
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("migrate_legacy_hash", e))?;
        tracing::info!(user_id = %user_id, "migrated legacy password hash");
        Ok(())
    }

    /// Increment the login counter and stamp the last login time
    pub async fn record_login(&self, user: &user::Model) -> Result<(), InternalError> {
        let update = user::ActiveModel {
            id: Unchanged(user.id.clone()),
            login_count: Set(user.login_count + 1),
            last_login_at: Set(Some(Utc::now().timestamp())),
            ..Default::default()
        };
        update
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("record_login", e))?;
        Ok(())
    }

    /// Change a user's password after verifying the old one
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), CredentialError> {
        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or(CredentialError::UserNotFound)?;

        self.verify_credentials(&user.email, old_password).await?;

        let update = user::ActiveModel {
            id: Unchanged(user_id.to_string()),
            password_hash: Set(self.hash_password(new_password)?),
            updated_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };
        update
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("change_password", e))?;
        Ok(())
    }

    /// Change a user's status ("active"/"disabled"); users are never deleted
    pub async fn set_status(&self, user_id: &str, status: &str) -> Result<(), CredentialError> {
        self.update_user_field(user_id, |m| m.status = Set(status.to_string()))
            .await
    }

    /// Change a user's role reference
    pub async fn set_role(&self, user_id: &str, role_id: &str) -> Result<(), CredentialError> {
        self.update_user_field(user_id, |m| m.role_id = Set(role_id.to_string()))
            .await
    }

    /// Store a freshly generated secret and mark enrollment as pending
    pub async fn set_totp_pending(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<(), CredentialError> {
        self.update_user_field(user_id, |m| {
            m.totp_secret = Set(Some(secret.to_string()));
            m.totp_state = Set(user::TOTP_STATE_PENDING.to_string());
        })
        .await
    }

    /// Activate the pending secret after a successful confirmation
    pub async fn set_totp_enabled(&self, user_id: &str) -> Result<(), CredentialError> {
        self.update_user_field(user_id, |m| {
            m.totp_state = Set(user::TOTP_STATE_ENABLED.to_string())
        })
        .await
    }

    /// Clear the secret and return the factor to the disabled state
    pub async fn clear_totp(&self, user_id: &str) -> Result<(), CredentialError> {
        self.update_user_field(user_id, |m| {
            m.totp_secret = Set(None);
            m.totp_state = Set(user::TOTP_STATE_DISABLED.to_string());
        })
        .await?;
        self.delete_backup_codes(user_id).await?;
        Ok(())
    }

    async fn update_user_field<F>(&self, user_id: &str, apply: F) -> Result<(), CredentialError>
    where
        F: FnOnce(&mut user::ActiveModel),
    {
        let existing = self
            .find_by_id(user_id)
            .await?
            .ok_or(CredentialError::UserNotFound)?;

        let mut update = user::ActiveModel {
            id: Unchanged(existing.id),
            updated_at: Set(Utc::now().timestamp()),
            ..Default::default()
        };
        apply(&mut update);
        update
            .update(&self.db)
            .await
            .map_err(|e| InternalError::database("update_user", e))?;
        Ok(())
    }

    /// Replace all backup codes for a user with freshly generated ones
    ///
    /// Stores HMAC-SHA256 digests only. Returns the plaintext codes, which
    /// are shown to the user exactly once.
    pub async fn replace_backup_codes(
        &self,
        user_id: &str,
        count: usize,
    ) -> Result<Vec<String>, InternalError> {
        self.delete_backup_codes(user_id).await?;

        let mut codes = Vec::with_capacity(count);
        for _ in 0..count {
            let code = crypto::generate_backup_code();
            let row = totp_backup_code::ActiveModel {
                id: sea_orm::ActiveValue::NotSet,
                user_id: Set(user_id.to_string()),
                code_hash: Set(crypto::hmac_sha256_hex(&self.password_pepper, &code)),
                consumed_at: Set(None),
            };
            row.insert(&self.db)
                .await
                .map_err(|e| InternalError::database("insert_backup_code", e))?;
            codes.push(code);
        }
        Ok(codes)
    }

    /// Consume a backup code if it matches an unspent row
    ///
    /// Returns true when a code was consumed. A code that was already spent
    /// does not match again: consumption is one-way.
    pub async fn consume_backup_code(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<bool, InternalError> {
        let digest = crypto::hmac_sha256_hex(&self.password_pepper, code);

        let rows = TotpBackupCode::find()
            .filter(totp_backup_code::Column::UserId.eq(user_id))
            .filter(totp_backup_code::Column::ConsumedAt.is_null())
            .all(&self.db)
            .await
            .map_err(|e| InternalError::database("find_backup_codes", e))?;

        for row in rows {
            if crypto::constant_time_eq(&row.code_hash, &digest) {
                let update = totp_backup_code::ActiveModel {
                    id: Unchanged(row.id),
                    consumed_at: Set(Some(Utc::now().to_rfc3339())),
                    ..Default::default()
                };
                update
                    .update(&self.db)
                    .await
                    .map_err(|e| InternalError::database("consume_backup_code", e))?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn delete_backup_codes(&self, user_id: &str) -> Result<(), InternalError> {
        TotpBackupCode::delete_many()
            .filter(totp_backup_code::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(|e| InternalError::database("delete_backup_codes", e))?;
        Ok(())
    }
}
