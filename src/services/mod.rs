// Services layer - Business logic and orchestration
pub mod audit_recorder;
pub mod auth_service;
pub mod crypto;
pub mod geo;
pub mod permission_service;
pub mod token_service;
pub mod totp_service;

pub use audit_recorder::AuditRecorder;
pub use auth_service::AuthService;
pub use permission_service::PermissionService;
pub use token_service::TokenService;
pub use totp_service::TotpService;
