// Data transfer objects for the HTTP API
pub mod admin;
pub mod audit;
pub mod auth;
pub mod common;
pub mod totp;
