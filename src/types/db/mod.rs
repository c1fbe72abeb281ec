// Database entities (SeaORM models)
pub mod audit_log_entry;
pub mod permission;
pub mod role;
pub mod role_permission;
pub mod totp_backup_code;
pub mod user;
