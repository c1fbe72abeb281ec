use std::sync::Arc;
use std::time::Duration;

use poem::{listener::TcpListener, Route, Server};
use poem_openapi::OpenApiService;
use sea_orm::{Database, DatabaseConnection};

use migration::{Migrator, MigratorTrait};
use stockpile_backend::api::{AdminApi, AuditApi, AuthApi, AuthGate, HealthApi, TotpApi};
use stockpile_backend::errors::internal::CredentialError;
use stockpile_backend::config::{logging, AppSettings, Secrets};
use stockpile_backend::services::geo::{GeoResolver, HttpGeoResolver};
use stockpile_backend::services::{
    AuditRecorder, AuthService, PermissionService, TokenService, TotpService,
};
use stockpile_backend::stores::{AuditStore, CredentialStore, RoleStore};
use stockpile_backend::types::db::role;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let settings = AppSettings::from_env();
    let secrets = Secrets::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {}", e);
        std::process::exit(1);
    });

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://stockpile.db?mode=rwc".to_string());

    let db: DatabaseConnection = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("connected to database: {}", database_url);

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Stores
    let credential_store = Arc::new(CredentialStore::new(
        db.clone(),
        secrets.password_pepper.clone(),
    ));
    let role_store = Arc::new(RoleStore::new(db.clone()));
    let audit_store = Arc::new(AuditStore::new(db.clone()));

    role_store
        .seed_defaults()
        .await
        .expect("Failed to seed roles and permissions");

    // Audit recorder with optional geolocation enrichment
    let geo: Option<Arc<dyn GeoResolver>> = settings
        .geo_lookup_url
        .clone()
        .map(|url| {
            Arc::new(HttpGeoResolver::new(url, settings.geo_timeout_ms)) as Arc<dyn GeoResolver>
        });
    let audit_recorder = AuditRecorder::new(
        audit_store.clone(),
        geo,
        Duration::from_millis(settings.geo_timeout_ms),
        settings.audit_queue_bound,
    );
    let worker = audit_recorder.spawn_worker();

    // Services
    let permission_service = Arc::new(PermissionService::new(
        role_store.clone(),
        audit_recorder.clone(),
    ));
    let token_service = Arc::new(TokenService::new(
        secrets.jwt_secret.clone(),
        settings.token_ttl_hours,
        settings.token_audience.clone(),
        settings.token_issuer.clone(),
    ));
    let totp_service = Arc::new(TotpService::new(
        credential_store.clone(),
        settings.totp_issuer.clone(),
        settings.totp_max_attempts,
        Duration::from_secs(settings.totp_window_secs),
    ));
    let auth_service = Arc::new(AuthService::new(
        credential_store.clone(),
        role_store.clone(),
        permission_service.clone(),
        token_service.clone(),
        totp_service.clone(),
        audit_recorder.clone(),
        Duration::from_secs(settings.challenge_ttl_secs),
    ));
    let gate = Arc::new(AuthGate::new(
        token_service.clone(),
        permission_service.clone(),
    ));

    bootstrap_admin(&credential_store, &role_store).await;

    // API surface
    let api_service = OpenApiService::new(
        (
            HealthApi,
            AuthApi::new(auth_service.clone(), gate.clone()),
            TotpApi::new(
                credential_store.clone(),
                totp_service.clone(),
                audit_recorder.clone(),
                gate.clone(),
            ),
            AdminApi::new(
                credential_store.clone(),
                role_store.clone(),
                permission_service.clone(),
                audit_recorder.clone(),
                gate.clone(),
            ),
            AuditApi::new(audit_store.clone(), gate.clone()),
        ),
        "Stockpile Backend",
        env!("CARGO_PKG_VERSION"),
    )
    .server("http://localhost:3000/api");

    let ui = api_service.swagger_ui();
    let app = Route::new().nest("/api", api_service).nest("/swagger", ui);

    let bind_addr =
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    tracing::info!("starting server on http://{}", bind_addr);

    let result = Server::new(TcpListener::bind(bind_addr))
        .run_with_graceful_shutdown(
            app,
            async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown signal received");
            },
            Some(Duration::from_secs(10)),
        )
        .await;

    // Flush pending audit writes; in-flight geolocation enrichment is
    // abandoned here.
    audit_recorder.shutdown();
    let _ = worker.await;

    result
}

/// Create the initial super admin from the environment if it does not exist
///
/// Controlled by BOOTSTRAP_ADMIN_EMAIL / BOOTSTRAP_ADMIN_PASSWORD; skipped
/// silently when unset.
async fn bootstrap_admin(credentials: &Arc<CredentialStore>, roles: &Arc<RoleStore>) {
    let (Ok(email), Ok(password)) = (
        std::env::var("BOOTSTRAP_ADMIN_EMAIL"),
        std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
    ) else {
        return;
    };

    let super_admin = match roles.find_role_by_name(role::SUPER_ADMIN).await {
        Ok(Some(role)) => role,
        _ => {
            tracing::error!("super_admin role missing, cannot bootstrap");
            return;
        }
    };

    match credentials
        .create_user(&email, "Administrator", &password, &super_admin.id)
        .await
    {
        Ok(user) => tracing::info!(user_id = %user.id, "bootstrap admin created"),
        Err(CredentialError::DuplicateEmail) => {
            tracing::debug!("bootstrap admin already exists");
        }
        Err(e) => tracing::error!("failed to create bootstrap admin: {}", e),
    }
}
