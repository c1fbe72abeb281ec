// Common test utilities for integration tests

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter};

use migration::{Migrator, MigratorTrait};
use stockpile_backend::api::AuthGate;
use stockpile_backend::services::geo::GeoResolver;
use stockpile_backend::services::{
    AuditRecorder, AuthService, PermissionService, TokenService, TotpService,
};
use stockpile_backend::stores::{AuditStore, CredentialStore, RoleStore};
use stockpile_backend::types::db::{audit_log_entry, user};
use stockpile_backend::types::internal::context::RequestContext;

pub const TEST_PEPPER: &str = "test-pepper-minimum-32-characters-long";
pub const TEST_JWT_SECRET: &str = "test-secret-key-minimum-32-characters-long";

/// Everything a flow test needs, wired against one in-memory database
pub struct TestEnv {
    pub db: DatabaseConnection,
    pub credentials: Arc<CredentialStore>,
    pub roles: Arc<RoleStore>,
    pub audit_store: Arc<AuditStore>,
    pub recorder: Arc<AuditRecorder>,
    pub permissions: Arc<PermissionService>,
    pub tokens: Arc<TokenService>,
    pub totp: Arc<TotpService>,
    pub auth: Arc<AuthService>,
    pub gate: Arc<AuthGate>,
}

/// Build a full service stack over an in-memory SQLite database
pub async fn setup_test_env() -> TestEnv {
    setup_test_env_with(None, 5).await
}

/// Variant allowing a geolocation stub and a custom TOTP attempt limit
pub async fn setup_test_env_with(
    geo: Option<Arc<dyn GeoResolver>>,
    totp_max_attempts: u32,
) -> TestEnv {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let credentials = Arc::new(CredentialStore::new(db.clone(), TEST_PEPPER.to_string()));
    let roles = Arc::new(RoleStore::new(db.clone()));
    let audit_store = Arc::new(AuditStore::new(db.clone()));

    roles.seed_defaults().await.expect("Failed to seed defaults");

    let recorder = AuditRecorder::new(
        audit_store.clone(),
        geo,
        Duration::from_millis(500),
        64,
    );

    let permissions = Arc::new(PermissionService::new(roles.clone(), recorder.clone()));
    let tokens = Arc::new(TokenService::new(
        TEST_JWT_SECRET.to_string(),
        24,
        "stockpile-web".to_string(),
        "stockpile-backend".to_string(),
    ));
    let totp = Arc::new(TotpService::new(
        credentials.clone(),
        "Stockpile".to_string(),
        totp_max_attempts,
        Duration::from_secs(300),
    ));
    let auth = Arc::new(AuthService::new(
        credentials.clone(),
        roles.clone(),
        permissions.clone(),
        tokens.clone(),
        totp.clone(),
        recorder.clone(),
        Duration::from_secs(300),
    ));
    let gate = Arc::new(AuthGate::new(tokens.clone(), permissions.clone()));

    TestEnv {
        db,
        credentials,
        roles,
        audit_store,
        recorder,
        permissions,
        tokens,
        totp,
        auth,
        gate,
    }
}

impl TestEnv {
    /// Create a user with the named seeded role and return the model
    pub async fn create_user(&self, email: &str, password: &str, role_name: &str) -> user::Model {
        let role = self
            .roles
            .find_role_by_name(role_name)
            .await
            .expect("role lookup failed")
            .expect("role missing");
        self.credentials
            .create_user(email, "Test User", password, &role.id)
            .await
            .expect("Failed to create test user")
    }

    /// A request context mimicking an API client
    pub fn client_ctx(&self) -> RequestContext {
        RequestContext::anonymous(Some("203.0.113.7".to_string()), Some("test-agent".to_string()))
    }

    /// Fetch all audit entries for an action verb
    pub async fn audit_entries(&self, action: &str) -> Vec<audit_log_entry::Model> {
        self.recorder.drain().await;
        audit_log_entry::Entity::find()
            .filter(audit_log_entry::Column::Action.eq(action))
            .all(&self.db)
            .await
            .expect("Failed to query audit entries")
    }

    /// Reload a user by id
    pub async fn reload_user(&self, user_id: &str) -> user::Model {
        self.credentials
            .find_by_id(user_id)
            .await
            .expect("user lookup failed")
            .expect("user missing")
    }
}
